//! Shared cohort for command tests.

use tla_core::{Cohort, CohortDocument, EngineConfig, Session};

/// p1 has samples on days 0, 30 and 90, p2 on days 0 and 40.
pub const COHORT_JSON: &str = r#"{
    "patients": ["p1", "p2"],
    "events": {
        "p1": [
            {"eventType": "SPECIMEN", "startDay": 0, "attributes": [{"key": "SAMPLE_ID", "value": "a0"}]},
            {"eventType": "SPECIMEN", "startDay": 30, "attributes": [{"key": "SAMPLE_ID", "value": "a1"}]},
            {"eventType": "SPECIMEN", "startDay": 90, "attributes": [{"key": "SAMPLE_ID", "value": "a2"}]},
            {"eventType": "TREATMENT", "startDay": 45, "endDay": 75, "attributes": [{"key": "AGENT", "value": "Cisplatin"}]},
            {"eventType": "STATUS", "startDay": -10, "attributes": [{"key": "STATE", "value": "diagnosed"}]}
        ],
        "p2": [
            {"eventType": "SPECIMEN", "startDay": 0, "attributes": [{"key": "SAMPLE_ID", "value": "b0"}]},
            {"eventType": "SPECIMEN", "startDay": 40, "attributes": [{"key": "SAMPLE_ID", "value": "b1"}]},
            {"eventType": "TREATMENT", "startDay": 10, "endDay": 20, "attributes": [{"key": "AGENT", "value": "Carboplatin"}]}
        ]
    },
    "attributes": {
        "sample": [{"id": "TUMOR_SIZE", "displayName": "Tumor size", "datatype": "NUMBER"}],
        "patient": [{"id": "SEX", "displayName": "Sex", "datatype": "STRING"}]
    },
    "values": {
        "sample": [
            {"patientId": "p1", "sampleId": "a0", "attributeId": "TUMOR_SIZE", "value": "2"},
            {"patientId": "p1", "sampleId": "a1", "attributeId": "TUMOR_SIZE", "value": "7"},
            {"patientId": "p2", "sampleId": "b1", "attributeId": "TUMOR_SIZE", "value": "9"}
        ],
        "patient": [
            {"patientId": "p1", "attributeId": "SEX", "value": "F"},
            {"patientId": "p2", "attributeId": "SEX", "value": "M"}
        ]
    }
}"#;

pub fn session() -> Session {
    let document: CohortDocument = serde_json::from_str(COHORT_JSON).unwrap();
    Session::new(Cohort::load(&document, &EngineConfig::default()).unwrap())
}
