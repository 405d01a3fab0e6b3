//! Variables: identified, typed sample-to-value mappers with provenance.

use serde::{Deserialize, Serialize};

use crate::transform::{Modification, TransformError};
use crate::types::{Datatype, VariableCategory, VariableId};
use crate::value::{Domain, Mapper};

/// How a variable came to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Mapper supplied by ingestion.
    Original,
    /// Mapper computed from other variables.
    Derived {
        source_ids: Vec<VariableId>,
        modification: Modification,
    },
}

/// A row-backing variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub datatype: Datatype,
    pub domain: Domain,
    pub category: VariableCategory,
    pub mapper: Mapper,
    pub provenance: Provenance,
}

impl Variable {
    /// Creates an original variable; its domain is computed from the mapper.
    pub fn original(
        id: VariableId,
        name: impl Into<String>,
        datatype: Datatype,
        category: VariableCategory,
        mapper: Mapper,
    ) -> Self {
        let domain = Domain::from_mapper(&mapper, datatype);
        Self {
            id,
            name: name.into(),
            description: String::new(),
            datatype,
            domain,
            category,
            mapper,
            provenance: Provenance::Original,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Creates a derived variable by applying `modification` to `sources`.
    ///
    /// Rejects a source list containing `id` itself. Transitive cycles can
    /// only be detected against a graph, see
    /// [`VariableGraph::plan_derivation`](crate::graph::VariableGraph::plan_derivation).
    pub fn derived(
        id: VariableId,
        name: impl Into<String>,
        sources: &[&Self],
        modification: Modification,
    ) -> Result<Self, DeriveError> {
        if sources.iter().any(|s| s.id == id) {
            return Err(DeriveError::SelfReference { id });
        }
        let mappers: Vec<&Mapper> = sources.iter().map(|s| &s.mapper).collect();
        let mapper = modification.apply(&mappers)?;
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        let description = format!("{} of {}", modification.name(), names.join(", "));

        Ok(Self {
            id,
            name: name.into(),
            description,
            datatype: modification.datatype(),
            domain: modification.domain(&mapper),
            category: VariableCategory::Derived,
            mapper,
            provenance: Provenance::Derived {
                source_ids: sources.iter().map(|s| s.id.clone()).collect(),
                modification,
            },
        })
    }

    /// Recomputes a derived variable from (possibly updated) sources.
    ///
    /// `sources` must be given in `source_ids` order. Original variables are
    /// returned unchanged.
    pub fn recompute(&self, sources: &[&Self]) -> Result<Self, DeriveError> {
        let Provenance::Derived {
            source_ids,
            modification,
        } = &self.provenance
        else {
            return Ok(self.clone());
        };
        let given: Vec<&VariableId> = sources.iter().map(|s| &s.id).collect();
        if given.len() != source_ids.len() || given.iter().zip(source_ids).any(|(a, b)| *a != b) {
            return Err(DeriveError::SourceMismatch {
                id: self.id.clone(),
            });
        }
        let mut fresh = Self::derived(self.id.clone(), self.name.clone(), sources, modification.clone())?;
        fresh.description.clone_from(&self.description);
        Ok(fresh)
    }

    /// Ids this variable is computed from; an original variable lists itself.
    pub fn source_ids(&self) -> &[VariableId] {
        match &self.provenance {
            Provenance::Original => std::slice::from_ref(&self.id),
            Provenance::Derived { source_ids, .. } => source_ids,
        }
    }

    pub const fn is_derived(&self) -> bool {
        matches!(self.provenance, Provenance::Derived { .. })
    }

    /// The modification behind a derived variable.
    pub const fn modification(&self) -> Option<&Modification> {
        match &self.provenance {
            Provenance::Original => None,
            Provenance::Derived { modification, .. } => Some(modification),
        }
    }
}

/// Errors raised while building a derived variable.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum DeriveError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The variable would list itself as a source.
    #[error("variable {id} cannot be derived from itself")]
    SelfReference { id: VariableId },

    /// Sources passed to `recompute` don't match the recorded provenance.
    #[error("sources given for {id} do not match its recorded source ids")]
    SourceMismatch { id: VariableId },
}
