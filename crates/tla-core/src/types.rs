//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffix of the synthetic sample that marks a patient leaving observation.
pub const POST_SUFFIX: &str = "_post";

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Unknown datatype string.
    #[error("invalid datatype: {value}")]
    InvalidDatatype { value: String },

    /// Unknown move direction string.
    #[error("invalid direction: {value} (expected \"up\" or \"down\")")]
    InvalidDirection { value: String },

    /// Unknown attribute scope string.
    #[error("invalid attribute scope: {value}")]
    InvalidScope { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated patient identifier.
    PatientId, "patient ID"
);

define_string_id!(
    /// A validated sample identifier.
    ///
    /// Real samples come from specimen events. The synthetic `<id>_post`
    /// sample of a patient is built with [`SampleId::post`].
    SampleId, "sample ID"
);

define_string_id!(
    /// A validated variable identifier.
    ///
    /// Original variables use ids from the data source; derived variables get
    /// a random one from [`VariableId::generate`] unless the caller picks one.
    VariableId, "variable ID"
);

impl SampleId {
    /// Returns the synthetic "after last observation" sample for this sample.
    #[must_use]
    pub fn post(&self) -> Self {
        Self(format!("{}{POST_SUFFIX}", self.0))
    }

    /// Whether this is a synthetic `_post` sample.
    pub fn is_post(&self) -> bool {
        self.0.ends_with(POST_SUFFIX)
    }
}

impl VariableId {
    /// Creates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// The kind of values a variable holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    Number,
    String,
    Binary,
    Ordinal,
    Binned,
}

impl Datatype {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::Binary => "BINARY",
            Self::Ordinal => "ORDINAL",
            Self::Binned => "BINNED",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Datatype {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NUMBER" => Ok(Self::Number),
            "STRING" => Ok(Self::String),
            "BINARY" => Ok(Self::Binary),
            "ORDINAL" => Ok(Self::Ordinal),
            "BINNED" => Ok(Self::Binned),
            _ => Err(ValidationError::InvalidDatatype {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for Datatype {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Datatype {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where a variable's data originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableCategory {
    /// Sample-level clinical attribute.
    ClinicalSample,
    /// Patient-level clinical attribute broadcast to every sample.
    ClinicalPatient,
    /// Occurrence of a clinical event between timepoints.
    Event,
    /// Computed during ingestion (e.g. time between timepoints).
    Computed,
    /// Result of a modification applied to other variables.
    Derived,
}

impl VariableCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClinicalSample => "clinical_sample",
            Self::ClinicalPatient => "clinical_patient",
            Self::Event => "event",
            Self::Computed => "computed",
            Self::Derived => "derived",
        }
    }
}

impl fmt::Display for VariableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a structural or row move.
///
/// `Up` is towards earlier timepoints (or the top row), `Down` towards later
/// timepoints (or the bottom row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(ValidationError::InvalidDirection {
                value: s.to_string(),
            }),
        }
    }
}
