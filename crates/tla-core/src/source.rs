//! Data source contract.
//!
//! Anything that can list patients, their events and clinical attributes can
//! feed a [`Cohort`](crate::cohort::Cohort). [`CohortDocument`] is a plain
//! serde model of the same data, used for files and tests.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::ClinicalEvent;
use crate::types::{Datatype, PatientId, SampleId, ValidationError};

/// Boxed error raised by a data source.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Level at which a clinical attribute is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeScope {
    Sample,
    Patient,
}

impl fmt::Display for AttributeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample => write!(f, "sample"),
            Self::Patient => write!(f, "patient"),
        }
    }
}

impl std::str::FromStr for AttributeScope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sample" => Ok(Self::Sample),
            "patient" => Ok(Self::Patient),
            _ => Err(ValidationError::InvalidScope {
                value: s.to_string(),
            }),
        }
    }
}

/// Metadata of a clinical attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDescriptor {
    pub id: String,
    pub display_name: String,
    pub datatype: Datatype,
    #[serde(default)]
    pub description: String,
}

/// One recorded clinical value.
///
/// Patient-scoped values have no `sample_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalValue {
    pub patient_id: PatientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<SampleId>,
    pub attribute_id: String,
    pub value: serde_json::Value,
}

impl ClinicalValue {
    /// Textual form of the value; strings are returned unquoted.
    pub fn text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Consumed interface of a cohort provider.
pub trait DataSource {
    /// Patient ids in cohort order.
    fn patients(&self) -> Result<Vec<PatientId>, SourceError>;

    /// Events of the given patients, in source order.
    fn events(
        &self,
        patients: &[PatientId],
    ) -> Result<HashMap<PatientId, Vec<ClinicalEvent>>, SourceError>;

    fn clinical_attributes(
        &self,
        scope: AttributeScope,
    ) -> Result<Vec<AttributeDescriptor>, SourceError>;

    fn clinical_values(&self, scope: AttributeScope) -> Result<Vec<ClinicalValue>, SourceError>;
}

/// Attribute descriptors or values split by scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scoped<T> {
    pub sample: Vec<T>,
    pub patient: Vec<T>,
}

impl<T> Default for Scoped<T> {
    fn default() -> Self {
        Self {
            sample: Vec::new(),
            patient: Vec::new(),
        }
    }
}

impl<T> Scoped<T> {
    pub fn get(&self, scope: AttributeScope) -> &[T] {
        match scope {
            AttributeScope::Sample => &self.sample,
            AttributeScope::Patient => &self.patient,
        }
    }
}

/// A whole cohort held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortDocument {
    pub patients: Vec<PatientId>,
    pub events: HashMap<PatientId, Vec<ClinicalEvent>>,
    pub attributes: Scoped<AttributeDescriptor>,
    pub values: Scoped<ClinicalValue>,
}

impl DataSource for CohortDocument {
    fn patients(&self) -> Result<Vec<PatientId>, SourceError> {
        Ok(self.patients.clone())
    }

    fn events(
        &self,
        patients: &[PatientId],
    ) -> Result<HashMap<PatientId, Vec<ClinicalEvent>>, SourceError> {
        Ok(patients
            .iter()
            .filter_map(|p| self.events.get(p).map(|e| (p.clone(), e.clone())))
            .collect())
    }

    fn clinical_attributes(
        &self,
        scope: AttributeScope,
    ) -> Result<Vec<AttributeDescriptor>, SourceError> {
        Ok(self.attributes.get(scope).to_vec())
    }

    fn clinical_values(&self, scope: AttributeScope) -> Result<Vec<ClinicalValue>, SourceError> {
        Ok(self.values.get(scope).to_vec())
    }
}
