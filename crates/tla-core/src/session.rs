//! An editing session over a loaded cohort.
//!
//! Combines the current alignment with the variable graph. Heatmap rows are
//! computed from both on every read.

use serde::Serialize;

use crate::cohort::Cohort;
use crate::graph::{DerivationPlan, GraphError, VariableGraph};
use crate::timepoint::{AlignmentError, Entry, TimepointGrid};
use crate::transform::Modification;
use crate::types::{Datatype, Direction, PatientId, VariableId};
use crate::value::Value;
use crate::variable::Variable;

/// One displayed variable evaluated at one timepoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub variable: VariableId,
    pub name: String,
    pub datatype: Datatype,
    /// One value per entry of the timepoint, `None` when undefined.
    pub values: Vec<Option<Value>>,
}

/// A timepoint with its entries and heatmap rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimepointView {
    pub index: usize,
    pub label: String,
    pub entries: Vec<(PatientId, String)>,
    pub rows: Vec<HeatmapRow>,
}

/// Alignment plus variable graph for one cohort.
#[derive(Debug, Clone)]
pub struct Session {
    cohort: Cohort,
    grid: TimepointGrid,
    graph: VariableGraph,
}

impl Session {
    pub fn new(cohort: Cohort) -> Self {
        let grid = cohort.grid().clone();
        Self {
            cohort,
            grid,
            graph: VariableGraph::new(),
        }
    }

    pub const fn cohort(&self) -> &Cohort {
        &self.cohort
    }

    pub const fn grid(&self) -> &TimepointGrid {
        &self.grid
    }

    pub const fn graph(&self) -> &VariableGraph {
        &self.graph
    }

    pub const fn graph_mut(&mut self) -> &mut VariableGraph {
        &mut self.graph
    }

    /// Sum of the grid and graph versions; changes on every edit.
    pub const fn version(&self) -> u64 {
        self.grid.version() + self.graph.version()
    }

    /// Referenced variables first, then the cohort catalogue.
    pub fn variable_by_id(&self, id: &VariableId) -> Result<&Variable, GraphError> {
        self.graph
            .get(id)
            .or_else(|| self.cohort.variable(id))
            .ok_or_else(|| GraphError::UnknownVariable { id: id.clone() })
    }

    /// Displayed variables, top to bottom.
    pub fn displayed_variables(&self) -> Vec<&Variable> {
        self.graph.displayed_variables().collect()
    }

    /// Displays a catalogue variable.
    pub fn display(&mut self, id: &VariableId) -> Result<u64, GraphError> {
        let variable = self
            .cohort
            .variable(id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownVariable { id: id.clone() })?;
        self.graph.add_displayed(variable)
    }

    /// Plans a derivation, pulling catalogue sources into the graph as
    /// needed.
    ///
    /// Sources that are neither referenced nor in the catalogue are an error.
    /// The graph is not changed until [`Session::add_derived`].
    pub fn plan(
        &self,
        name: impl Into<String>,
        source_ids: &[VariableId],
        modification: Modification,
    ) -> Result<DerivationPlan, GraphError> {
        let mut scratch = self.graph.clone();
        for id in source_ids {
            if !scratch.contains(id) {
                let variable = self
                    .cohort
                    .variable(id)
                    .cloned()
                    .ok_or_else(|| GraphError::UnknownVariable { id: id.clone() })?;
                scratch.reference(variable)?;
            }
        }
        scratch.plan_derivation(None, name, source_ids, modification)
    }

    /// Displays a planned variable, referencing catalogue sources it needs.
    pub fn add_derived(&mut self, plan: DerivationPlan) -> Result<u64, GraphError> {
        let variable = plan.into_variable();
        let sources: Vec<Variable> = variable
            .source_ids()
            .iter()
            .filter(|id| !self.graph.contains(id))
            .filter_map(|id| self.cohort.variable(id).cloned())
            .collect();
        self.graph.add_displayed_with_sources(variable, sources)
    }

    /// Moves a patient within the alignment.
    pub fn move_patient(
        &mut self,
        patient: &PatientId,
        index: usize,
        direction: Direction,
    ) -> Result<u64, AlignmentError> {
        self.grid.move_patient(patient, index, direction)?;
        Ok(self.version())
    }

    /// Restores the default alignment and clears the graph.
    pub fn reset(&mut self) -> u64 {
        self.grid.reset();
        self.graph.reset();
        self.version()
    }

    /// Current timepoints with a row per displayed variable.
    pub fn timepoints(&self) -> Vec<TimepointView> {
        let displayed: Vec<&Variable> = self.graph.displayed_variables().collect();
        self.grid
            .timepoints()
            .iter()
            .enumerate()
            .map(|(index, entries)| TimepointView {
                index,
                label: self.grid.labels().get(index).cloned().unwrap_or_default(),
                entries: entries
                    .iter()
                    .map(|e| (e.patient.clone(), e.sample.to_string()))
                    .collect(),
                rows: displayed.iter().map(|v| heatmap_row(v, entries)).collect(),
            })
            .collect()
    }
}

fn heatmap_row(variable: &Variable, entries: &[Entry]) -> HeatmapRow {
    HeatmapRow {
        variable: variable.id.clone(),
        name: variable.name.clone(),
        datatype: variable.datatype,
        values: entries
            .iter()
            .map(|e| variable.mapper.get(&e.sample).cloned())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::source::CohortDocument;
    use crate::transform::Binning;
    use crate::types::VariableCategory;

    fn vid(s: &str) -> VariableId {
        VariableId::new(s).unwrap()
    }

    fn pid(s: &str) -> PatientId {
        PatientId::new(s).unwrap()
    }

    fn session() -> Session {
        let doc: CohortDocument = serde_json::from_str(
            r#"{
            "patients": ["p1", "p2"],
            "events": {
                "p1": [
                    {"eventType": "SPECIMEN", "startDay": 0, "attributes": [{"key": "SAMPLE_ID", "value": "a0"}]},
                    {"eventType": "SPECIMEN", "startDay": 30, "attributes": [{"key": "SAMPLE_ID", "value": "a1"}]},
                    {"eventType": "SPECIMEN", "startDay": 60, "attributes": [{"key": "SAMPLE_ID", "value": "a2"}]}
                ],
                "p2": [
                    {"eventType": "SPECIMEN", "startDay": 0, "attributes": [{"key": "SAMPLE_ID", "value": "b0"}]},
                    {"eventType": "SPECIMEN", "startDay": 40, "attributes": [{"key": "SAMPLE_ID", "value": "b1"}]}
                ]
            },
            "attributes": {"sample": [{"id": "AGE", "displayName": "Age", "datatype": "NUMBER"}]},
            "values": {"sample": [
                {"patientId": "p1", "sampleId": "a0", "attributeId": "AGE", "value": 2},
                {"patientId": "p1", "sampleId": "a1", "attributeId": "AGE", "value": 7},
                {"patientId": "p2", "sampleId": "b1", "attributeId": "AGE", "value": 9}
            ]}
        }"#,
        )
        .unwrap();
        Session::new(Cohort::load(&doc, &EngineConfig::default()).unwrap())
    }

    fn bins() -> Modification {
        Modification::Binning {
            binning: Binning::new(vec![0.0, 5.0, 10.0], vec!["low".into(), "high".into()]).unwrap(),
        }
    }

    #[test]
    fn rows_follow_displayed_order_and_entries() {
        let mut session = session();
        session.display(&vid("AGE")).unwrap();
        let views = session.timepoints();
        assert_eq!(views.len(), 3);
        assert_eq!(views[1].label, "TP2");
        assert_eq!(views[1].rows.len(), 1);
        assert_eq!(
            views[1].rows[0].values,
            [Some(Value::Number(7.0)), Some(Value::Number(9.0))]
        );
        assert_eq!(views[0].rows[0].values, [Some(Value::Number(2.0)), None]);
    }

    #[test]
    fn rows_rematerialize_after_move() {
        let mut session = session();
        session.display(&vid("AGE")).unwrap();
        let before = session.version();
        let after = session.move_patient(&pid("p2"), 1, Direction::Down).unwrap();
        assert!(after > before);

        let views = session.timepoints();
        assert_eq!(views[1].rows[0].values, [Some(Value::Number(7.0))]);
        assert_eq!(views[2].rows[0].values, [None, Some(Value::Number(9.0))]);
    }

    #[test]
    fn derived_variable_pulls_in_catalogue_source() {
        let mut session = session();
        let plan = session.plan("Age group", &[vid("AGE")], bins()).unwrap();
        assert!(!session.graph().contains(&vid("AGE")));
        let id = plan.variable().id.clone();
        session.add_derived(plan).unwrap();

        assert!(session.graph().contains(&vid("AGE")));
        assert!(!session.graph().is_displayed(&vid("AGE")));
        assert_eq!(session.displayed_variables().len(), 1);
        let views = session.timepoints();
        assert_eq!(
            views[0].rows[0].values,
            [Some(Value::from("low")), None]
        );
        assert_eq!(session.variable_by_id(&id).unwrap().category, VariableCategory::Derived);

        session.graph_mut().remove_displayed(&id).unwrap();
        assert!(!session.graph().contains(&vid("AGE")));
        assert!(session.variable_by_id(&vid("AGE")).is_ok());
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut session = session();
        assert!(matches!(
            session.display(&vid("nope")),
            Err(GraphError::UnknownVariable { .. })
        ));
        assert!(session.plan("x", &[vid("nope")], bins()).is_err());
        assert!(session.variable_by_id(&vid("nope")).is_err());
    }

    #[test]
    fn reset_clears_edits() {
        let mut session = session();
        session.display(&vid("AGE")).unwrap();
        session.move_patient(&pid("p1"), 0, Direction::Down).unwrap();
        session.reset();
        assert_eq!(session.grid().len(), 3);
        assert!(session.displayed_variables().is_empty());
    }
}
