//! Raw clinical events as delivered by a data source.

use serde::{Deserialize, Serialize};

/// A dated clinical event of one patient.
///
/// Days are offsets relative to diagnosis. Point events have no `end_day`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalEvent {
    /// Event type, e.g. `SPECIMEN` or `TREATMENT`.
    pub event_type: String,
    pub start_day: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_day: Option<f64>,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

/// A key/value pair attached to an event.
///
/// Sources send values as strings or numbers, so the raw JSON value is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: serde_json::Value,
}

impl EventAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Textual form of the value; strings are returned unquoted.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl ClinicalEvent {
    /// A point event with no attributes.
    pub fn point(event_type: impl Into<String>, day: f64) -> Self {
        Self {
            event_type: event_type.into(),
            start_day: day,
            end_day: None,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_end(mut self, end_day: f64) -> Self {
        self.end_day = Some(end_day);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.push(EventAttribute::new(key, value));
        self
    }

    /// End day, falling back to the start day for point events.
    pub fn end(&self) -> f64 {
        self.end_day.unwrap_or(self.start_day)
    }

    /// Textual value of the first attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(EventAttribute::value_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_deserializes_camel_case() {
        let json = r#"{
            "eventType": "TREATMENT",
            "startDay": 45,
            "endDay": 75,
            "attributes": [{"key": "AGENT", "value": "Cisplatin"}]
        }"#;
        let event: ClinicalEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "TREATMENT");
        assert_eq!(event.start_day, 45.0);
        assert_eq!(event.end(), 75.0);
        assert_eq!(event.attribute("AGENT").as_deref(), Some("Cisplatin"));
        assert_eq!(event.attribute("DOSE"), None);
    }

    #[test]
    fn point_event_ends_where_it_starts() {
        let json = r#"{"eventType": "STATUS", "startDay": -3}"#;
        let event: ClinicalEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.end_day, None);
        assert_eq!(event.end(), -3.0);
        assert!(event.attributes.is_empty());
    }

    #[test]
    fn numeric_attribute_values_read_as_text() {
        let event = ClinicalEvent::point("SPECIMEN", 0.0).with_attribute("SAMPLE_ID", 17);
        assert_eq!(event.attribute("SAMPLE_ID").as_deref(), Some("17"));
    }
}
