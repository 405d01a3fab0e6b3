//! Engine configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which event wins when several specimen events of a patient share a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameDayPolicy {
    /// Keep the first event in source order.
    #[default]
    First,
    /// Keep the last event in source order.
    Last,
}

impl fmt::Display for SameDayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// Settings threaded through cohort construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Event type marking specimen collection. Default: `SPECIMEN`.
    pub specimen_event_type: String,

    /// Attribute key holding the sample id of a specimen event.
    /// Default: `SAMPLE_ID`.
    pub sample_id_attribute: String,

    pub same_day_policy: SameDayPolicy,

    /// Prefix of default timepoint labels (`TP1`, `TP2`, ...).
    pub label_prefix: String,

    /// Label given to timepoints created by a move.
    pub placeholder_label: String,

    /// Emit per-operation debug logging.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            specimen_event_type: "SPECIMEN".to_string(),
            sample_id_attribute: "SAMPLE_ID".to_string(),
            same_day_policy: SameDayPolicy::First,
            label_prefix: "TP".to_string(),
            placeholder_label: "new".to_string(),
            verbose: false,
        }
    }
}

impl EngineConfig {
    /// Default label of the timepoint at `index`.
    pub fn label(&self, index: usize) -> String {
        format!("{}{}", self.label_prefix, index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"same_day_policy": "last"}"#).unwrap();
        assert_eq!(config.same_day_policy, SameDayPolicy::Last);
        assert_eq!(config.specimen_event_type, "SPECIMEN");
        assert_eq!(config.label(0), "TP1");
    }
}
