//! File-backed data source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tla_core::source::{SourceError, Scoped};
use tla_core::{
    AttributeDescriptor, AttributeScope, ClinicalEvent, ClinicalValue, CohortDocument, DataSource,
    PatientId,
};

/// A cohort read from a JSON document.
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
    document: CohortDocument,
}

impl JsonSource {
    /// Reads and parses a cohort document.
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let document: CohortDocument = serde_json::from_str(content)
            .with_context(|| format!("failed to parse cohort document {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            patients = document.patients.len(),
            "read cohort document"
        );
        warn_unlisted_patients(&document);
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Events keyed by patients missing from `patients` are never loaded.
fn warn_unlisted_patients(document: &CohortDocument) {
    for patient in document.events.keys() {
        if !document.patients.contains(patient) {
            tracing::warn!(%patient, "events for a patient not listed in `patients` are ignored");
        }
    }
}

fn scoped<T: Clone>(items: &Scoped<T>, scope: AttributeScope) -> Vec<T> {
    items.get(scope).to_vec()
}

impl DataSource for JsonSource {
    fn patients(&self) -> Result<Vec<PatientId>, SourceError> {
        self.document.patients()
    }

    fn events(
        &self,
        patients: &[PatientId],
    ) -> Result<HashMap<PatientId, Vec<ClinicalEvent>>, SourceError> {
        self.document.events(patients)
    }

    fn clinical_attributes(
        &self,
        scope: AttributeScope,
    ) -> Result<Vec<AttributeDescriptor>, SourceError> {
        Ok(scoped(&self.document.attributes, scope))
    }

    fn clinical_values(&self, scope: AttributeScope) -> Result<Vec<ClinicalValue>, SourceError> {
        Ok(scoped(&self.document.values, scope))
    }
}
