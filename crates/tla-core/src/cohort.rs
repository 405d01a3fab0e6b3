//! Cohort ingestion.
//!
//! Pulls everything from a [`DataSource`], builds the default timepoint
//! grid, matches events to intervals, and turns clinical attributes into the
//! catalogue of original variables.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::event::ClinicalEvent;
use crate::matcher::EventMatcher;
use crate::source::{AttributeDescriptor, AttributeScope, ClinicalValue, DataSource, SourceError};
use crate::timepoint::{AlignmentError, TimepointGrid};
use crate::types::{Datatype, PatientId, ValidationError, VariableCategory, VariableId};
use crate::value::{Mapper, Value};
use crate::variable::Variable;

/// Id of the computed "time between timepoints" variable.
pub const TIME_GAP_ID: &str = "TIME_BETWEEN_TIMEPOINTS";

/// Errors raised while loading a cohort.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("data source failed: {0}")]
    Source(#[source] SourceError),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Two attributes (or an attribute and an event key) share an id.
    #[error("duplicate variable id: {id}")]
    DuplicateVariable { id: VariableId },
}

/// Everything loaded from a data source.
#[derive(Debug, Clone)]
pub struct Cohort {
    config: EngineConfig,
    events: HashMap<PatientId, Vec<ClinicalEvent>>,
    grid: TimepointGrid,
    matcher: EventMatcher,
    /// Original variables in catalogue order.
    variables: Vec<Variable>,
    index: HashMap<VariableId, usize>,
}

impl Cohort {
    /// Loads and aligns a cohort.
    pub fn load(source: &impl DataSource, config: &EngineConfig) -> Result<Self, IngestError> {
        let patients = source.patients().map_err(IngestError::Source)?;
        let events = source.events(&patients).map_err(IngestError::Source)?;
        let grid = TimepointGrid::from_events(&patients, &events, config)?;
        let matcher = EventMatcher::build(&grid, &events, config);

        let mut cohort = Self {
            config: config.clone(),
            events,
            grid,
            matcher,
            variables: Vec::new(),
            index: HashMap::new(),
        };

        for scope in [AttributeScope::Sample, AttributeScope::Patient] {
            let descriptors = source.clinical_attributes(scope).map_err(IngestError::Source)?;
            let values = source.clinical_values(scope).map_err(IngestError::Source)?;
            for descriptor in &descriptors {
                let variable = cohort.clinical_variable(scope, descriptor, &values)?;
                cohort.register(variable)?;
            }
        }
        let time_gap = cohort.time_gap_variable()?;
        cohort.register(time_gap)?;
        for variable in cohort.matcher.variables(&cohort.grid)? {
            cohort.register(variable)?;
        }

        tracing::info!(
            patients = cohort.grid.patients().len(),
            timepoints = cohort.grid.len(),
            variables = cohort.variables.len(),
            "loaded cohort"
        );
        Ok(cohort)
    }

    fn register(&mut self, variable: Variable) -> Result<(), IngestError> {
        if self.index.contains_key(&variable.id) {
            return Err(IngestError::DuplicateVariable { id: variable.id });
        }
        self.index.insert(variable.id.clone(), self.variables.len());
        self.variables.push(variable);
        Ok(())
    }

    /// Builds the mapper of one clinical attribute.
    ///
    /// Patient values are copied to every real sample of the patient. Rows
    /// for samples outside the grid are ignored; NUMBER values that do not
    /// parse are skipped.
    fn clinical_variable(
        &self,
        scope: AttributeScope,
        descriptor: &AttributeDescriptor,
        values: &[ClinicalValue],
    ) -> Result<Variable, ValidationError> {
        let mut mapper = Mapper::new();
        for row in values.iter().filter(|v| v.attribute_id == descriptor.id) {
            let Some(value) = parse_value(&row.text(), descriptor.datatype) else {
                tracing::debug!(
                    attribute = %descriptor.id,
                    patient = %row.patient_id,
                    value = %row.text(),
                    "skipping unparsable value"
                );
                continue;
            };
            match scope {
                AttributeScope::Sample => {
                    let Some(sample) = row.sample_id.as_ref() else {
                        tracing::warn!(attribute = %descriptor.id, "sample value without sample id");
                        continue;
                    };
                    if self.grid.sample(sample).is_some() {
                        mapper.insert(sample.clone(), value);
                    }
                }
                AttributeScope::Patient => {
                    for sample in self.grid.samples(&row.patient_id).unwrap_or_default() {
                        mapper.insert(sample.id.clone(), value.clone());
                    }
                }
            }
        }

        let category = match scope {
            AttributeScope::Sample => VariableCategory::ClinicalSample,
            AttributeScope::Patient => VariableCategory::ClinicalPatient,
        };
        Ok(Variable::original(
            VariableId::new(descriptor.id.clone())?,
            descriptor.display_name.clone(),
            descriptor.datatype,
            category,
            mapper,
        )
        .with_description(descriptor.description.clone()))
    }

    /// Days since the previous sample of the same patient.
    ///
    /// Undefined for each patient's first sample and for `_post` samples.
    fn time_gap_variable(&self) -> Result<Variable, ValidationError> {
        let mut mapper = Mapper::new();
        for patient in self.grid.patients() {
            let samples = self.grid.samples(patient).unwrap_or_default();
            for pair in samples.windows(2) {
                mapper.insert(pair[1].id.clone(), Value::Number(pair[1].day - pair[0].day));
            }
        }
        Ok(Variable::original(
            VariableId::new(TIME_GAP_ID)?,
            "Time between timepoints",
            Datatype::Number,
            VariableCategory::Computed,
            mapper,
        )
        .with_description("Days since the previous sample of the patient"))
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The default alignment.
    pub const fn grid(&self) -> &TimepointGrid {
        &self.grid
    }

    pub const fn matcher(&self) -> &EventMatcher {
        &self.matcher
    }

    pub fn events(&self, patient: &PatientId) -> &[ClinicalEvent] {
        self.events.get(patient).map_or(&[], Vec::as_slice)
    }

    /// Original variables in catalogue order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: &VariableId) -> Option<&Variable> {
        self.index.get(id).map(|&i| &self.variables[i])
    }

    /// Catalogue entries of one category.
    pub fn variables_of(&self, category: VariableCategory) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(move |v| v.category == category)
    }

    /// Earliest and latest day of a patient across samples and events.
    pub fn day_span(&self, patient: &PatientId) -> Option<(f64, f64)> {
        let sample_days = self
            .grid
            .samples(patient)
            .unwrap_or_default()
            .iter()
            .map(|s| s.day);
        let event_days = self
            .events(patient)
            .iter()
            .flat_map(|e| [e.start_day, e.end()]);
        sample_days
            .chain(event_days)
            .filter(|d| d.is_finite())
            .fold(None, |span, day| match span {
                None => Some((day, day)),
                Some((lo, hi)) => Some((f64::min(lo, day), f64::max(hi, day))),
            })
    }
}

/// Parses a raw clinical value for a datatype.
fn parse_value(raw: &str, datatype: Datatype) -> Option<Value> {
    match datatype {
        Datatype::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number),
        Datatype::Binary => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(Value::Bool(true)),
            "false" | "no" => Some(Value::Bool(false)),
            _ => Some(Value::Text(raw.to_string())),
        },
        Datatype::String | Datatype::Ordinal | Datatype::Binned => {
            Some(Value::Text(raw.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CohortDocument;
    use crate::types::SampleId;

    fn sid(s: &str) -> SampleId {
        SampleId::new(s).unwrap()
    }

    fn vid(s: &str) -> VariableId {
        VariableId::new(s).unwrap()
    }

    fn document() -> CohortDocument {
        serde_json::from_str(
            r#"{
            "patients": ["p1", "p2", "p3"],
            "events": {
                "p1": [
                    {"eventType": "SPECIMEN", "startDay": 0, "attributes": [{"key": "SAMPLE_ID", "value": "a0"}]},
                    {"eventType": "SPECIMEN", "startDay": 30, "attributes": [{"key": "SAMPLE_ID", "value": "a1"}]},
                    {"eventType": "TREATMENT", "startDay": 10, "endDay": 200, "attributes": [{"key": "AGENT", "value": "Cisplatin"}]}
                ],
                "p2": [
                    {"eventType": "SPECIMEN", "startDay": -5, "attributes": [{"key": "SAMPLE_ID", "value": "b0"}]}
                ]
            },
            "attributes": {
                "sample": [{"id": "AGE", "displayName": "Age", "datatype": "NUMBER"}],
                "patient": [{"id": "SEX", "displayName": "Sex", "datatype": "STRING", "description": "Sex at birth"}]
            },
            "values": {
                "sample": [
                    {"patientId": "p1", "sampleId": "a0", "attributeId": "AGE", "value": "54"},
                    {"patientId": "p1", "sampleId": "a1", "attributeId": "AGE", "value": "n/a"},
                    {"patientId": "p2", "sampleId": "zz", "attributeId": "AGE", "value": "60"}
                ],
                "patient": [
                    {"patientId": "p1", "attributeId": "SEX", "value": "F"},
                    {"patientId": "p2", "attributeId": "SEX", "value": "M"}
                ]
            }
        }"#,
        )
        .unwrap()
    }

    fn load() -> Cohort {
        Cohort::load(&document(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn catalogue_lists_every_kind_of_variable() {
        let cohort = load();
        let ids: Vec<&str> = cohort.variables().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(
            ids,
            ["AGE", "SEX", TIME_GAP_ID, "TREATMENT:AGENT:Cisplatin"]
        );
        assert_eq!(cohort.grid().patients().len(), 2);
        assert_eq!(cohort.variables_of(VariableCategory::Event).count(), 1);
    }

    #[test]
    fn sample_values_are_parsed_and_filtered() {
        let cohort = load();
        let age = cohort.variable(&vid("AGE")).unwrap();
        assert_eq!(age.mapper.get(&sid("a0")), Some(&Value::Number(54.0)));
        assert_eq!(age.mapper.get(&sid("a1")), None);
        assert_eq!(age.mapper.len(), 1);
    }

    #[test]
    fn patient_values_are_broadcast() {
        let cohort = load();
        let sex = cohort.variable(&vid("SEX")).unwrap();
        assert_eq!(sex.category, VariableCategory::ClinicalPatient);
        assert_eq!(sex.description, "Sex at birth");
        assert_eq!(sex.mapper.get(&sid("a0")), Some(&Value::from("F")));
        assert_eq!(sex.mapper.get(&sid("a1")), Some(&Value::from("F")));
        assert_eq!(sex.mapper.get(&sid("b0")), Some(&Value::from("M")));
        assert_eq!(sex.mapper.get(&sid("a1_post")), None);
    }

    #[test]
    fn time_gap_is_undefined_for_first_and_post() {
        let cohort = load();
        let gap = cohort.variable(&vid(TIME_GAP_ID)).unwrap();
        assert_eq!(gap.mapper.get(&sid("a0")), None);
        assert_eq!(gap.mapper.get(&sid("a1")), Some(&Value::Number(30.0)));
        assert_eq!(gap.mapper.get(&sid("a1_post")), None);
        assert_eq!(gap.mapper.get(&sid("b0")), None);
    }

    #[test]
    fn day_span_includes_event_ends() {
        let cohort = load();
        let p1 = PatientId::new("p1").unwrap();
        assert_eq!(cohort.day_span(&p1), Some((0.0, 200.0)));
        let p3 = PatientId::new("p3").unwrap();
        assert_eq!(cohort.day_span(&p3), None);
    }

    #[test]
    fn duplicate_attribute_ids_are_rejected() {
        let mut doc = document();
        doc.attributes.patient.push(AttributeDescriptor {
            id: "AGE".into(),
            display_name: "Age again".into(),
            datatype: Datatype::Number,
            description: String::new(),
        });
        let err = Cohort::load(&doc, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::DuplicateVariable { .. }));
    }

    #[test]
    fn binary_values_parse_as_booleans() {
        assert_eq!(parse_value("Yes", Datatype::Binary), Some(Value::Bool(true)));
        assert_eq!(parse_value("false", Datatype::Binary), Some(Value::Bool(false)));
        assert_eq!(parse_value(" 7.5 ", Datatype::Number), Some(Value::Number(7.5)));
        assert_eq!(parse_value("NaN", Datatype::Number), None);
    }
}
