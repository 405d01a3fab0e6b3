//! Core domain logic for temporal cohort alignment.
//!
//! This crate contains the fundamental types and logic for:
//! - Alignment: placing each patient's samples into a shared timepoint grid
//!   and moving patients between timepoints
//! - Variables: sample-to-value mappers, derived through binning, combination
//!   and remapping, with reference-counted lifetime in a variable graph
//! - Event matching: turning dated clinical events into per-sample
//!   occurrence variables

pub mod cohort;
pub mod config;
pub mod event;
pub mod graph;
pub mod matcher;
pub mod session;
pub mod source;
pub mod timepoint;
pub mod transform;
pub mod types;
pub mod value;
pub mod variable;

pub use cohort::{Cohort, IngestError, TIME_GAP_ID};
pub use config::{EngineConfig, SameDayPolicy};
pub use event::{ClinicalEvent, EventAttribute};
pub use graph::{DerivationPlan, GraphError, VariableGraph};
pub use matcher::{EventKey, EventMatcher, Occurrence};
pub use session::{HeatmapRow, Session, TimepointView};
pub use source::{AttributeDescriptor, AttributeScope, ClinicalValue, CohortDocument, DataSource};
pub use timepoint::{AlignmentError, Entry, Sample, TimepointGrid};
pub use transform::{Binning, CombineOperator, ContinuousFn, Modification, TransformError};
pub use types::{Datatype, Direction, PatientId, SampleId, ValidationError, VariableCategory, VariableId};
pub use value::{Domain, Mapper, Value};
pub use variable::{DeriveError, Provenance, Variable};
