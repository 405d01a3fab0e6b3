//! Event-interval matching.
//!
//! A patient's samples cut the day axis into half-open intervals. The
//! interval ending at a sample is that sample's *preceding* interval:
//!
//! ```text
//! (-inf, d0) -> s0    [d0, d1) -> s1    ...    [d_last, +inf) -> s_last_post
//! ```
//!
//! A non-specimen event matches every interval that contains its start or
//! its end, so a range event crossing a sample date matches two. Each distinct
//! `(event type, attribute key, attribute value)` triple becomes a BINARY
//! variable that is true for the samples whose preceding interval holds a
//! matching event and explicitly false everywhere else.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::event::ClinicalEvent;
use crate::timepoint::{Sample, TimepointGrid};
use crate::types::{Datatype, PatientId, SampleId, ValidationError, VariableCategory, VariableId};
use crate::value::{Mapper, Value};
use crate::variable::Variable;

/// Identifies one kind of event occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventKey {
    pub event_type: String,
    pub attribute_key: String,
    pub attribute_value: String,
}

impl EventKey {
    pub fn new(
        event_type: impl Into<String>,
        attribute_key: impl Into<String>,
        attribute_value: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            attribute_key: attribute_key.into(),
            attribute_value: attribute_value.into(),
        }
    }

    /// Id of the occurrence variable, `type:key:value`.
    pub fn variable_id(&self) -> Result<VariableId, ValidationError> {
        VariableId::new(self.to_string())
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.event_type, self.attribute_key, self.attribute_value
        )
    }
}

/// The preceding interval of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    /// Inclusive lower bound, `-inf` for the first sample.
    pub start: f64,
    /// Exclusive upper bound, `+inf` for the `_post` sample.
    pub end: f64,
    pub sample: SampleId,
}

impl Interval {
    pub fn contains(&self, day: f64) -> bool {
        day >= self.start && day < self.end
    }
}

/// Builds the preceding intervals of a patient's chronological samples.
///
/// Yields one interval per sample plus the tail interval of the `_post`
/// sample; empty for a patient without samples.
pub fn intervals(samples: &[Sample]) -> Vec<Interval> {
    let Some(last) = samples.last() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(samples.len() + 1);
    let mut start = f64::NEG_INFINITY;
    for sample in samples {
        out.push(Interval {
            start,
            end: sample.day,
            sample: sample.id.clone(),
        });
        start = sample.day;
    }
    out.push(Interval {
        start,
        end: f64::INFINITY,
        sample: last.id.post(),
    });
    out
}

/// Index of the interval containing `day`.
fn interval_of(intervals: &[Interval], day: f64) -> Option<usize> {
    let index = intervals.partition_point(|i| i.end <= day);
    intervals
        .get(index)
        .filter(|i| i.contains(day))
        .map(|_| index)
}

/// Indices of the intervals containing either endpoint of an event, in time
/// order and without repeats.
fn matching_intervals(intervals: &[Interval], start: f64, end: f64) -> Vec<usize> {
    let mut matched: Vec<usize> = [start.min(end), start.max(end)]
        .into_iter()
        .filter_map(|day| interval_of(intervals, day))
        .collect();
    matched.dedup();
    matched
}

/// A matched event.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub key: EventKey,
    pub patient: PatientId,
    /// Sample whose preceding interval holds an endpoint of the event.
    pub sample: SampleId,
    /// Position of the interval in the patient's interval list.
    pub interval: usize,
    pub start: f64,
    pub end: f64,
}

/// Catalogue of event keys and their matched occurrences.
#[derive(Debug, Clone, Default)]
pub struct EventMatcher {
    /// Keys in first-seen order.
    catalog: Vec<EventKey>,
    occurrences: Vec<Occurrence>,
}

impl EventMatcher {
    /// Matches every non-specimen event of the grid's patients.
    ///
    /// Events of patients missing from the grid have no intervals and are
    /// skipped.
    pub fn build(
        grid: &TimepointGrid,
        events: &HashMap<PatientId, Vec<ClinicalEvent>>,
        config: &EngineConfig,
    ) -> Self {
        let mut catalog = Vec::new();
        let mut seen = HashSet::new();
        let mut occurrences = Vec::new();

        for patient in grid.patients() {
            let Some(patient_events) = events.get(patient) else {
                continue;
            };
            let Ok(samples) = grid.samples(patient) else {
                continue;
            };
            let intervals = intervals(samples);

            for event in patient_events
                .iter()
                .filter(|e| e.event_type != config.specimen_event_type)
            {
                let (start, end) = (event.start_day, event.end());
                if !start.is_finite() || !end.is_finite() {
                    tracing::warn!(%patient, event_type = %event.event_type, "skipping event with non-finite days");
                    continue;
                }
                let matched = matching_intervals(&intervals, start, end);
                for attribute in &event.attributes {
                    let key = EventKey::new(&event.event_type, &attribute.key, attribute.value_text());
                    if seen.insert(key.clone()) {
                        catalog.push(key.clone());
                    }
                    for &index in &matched {
                        occurrences.push(Occurrence {
                            key: key.clone(),
                            patient: patient.clone(),
                            sample: intervals[index].sample.clone(),
                            interval: index,
                            start,
                            end,
                        });
                    }
                }
            }
        }

        tracing::debug!(
            keys = catalog.len(),
            occurrences = occurrences.len(),
            "matched events to intervals"
        );
        Self {
            catalog,
            occurrences,
        }
    }

    /// Distinct event keys, in first-seen order.
    pub fn catalog(&self) -> &[EventKey] {
        &self.catalog
    }

    /// Distinct event types, in first-seen order.
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for key in &self.catalog {
            if !types.contains(&key.event_type.as_str()) {
                types.push(&key.event_type);
            }
        }
        types
    }

    /// Keys of one event type.
    pub fn keys_of_type<'a>(&'a self, event_type: &'a str) -> impl Iterator<Item = &'a EventKey> {
        self.catalog.iter().filter(move |k| k.event_type == event_type)
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Occurrences of one key, in patient then event order.
    pub fn occurrences_of<'a>(&'a self, key: &'a EventKey) -> impl Iterator<Item = &'a Occurrence> {
        self.occurrences.iter().filter(move |o| o.key == *key)
    }

    /// Occurrence mapper of a key over every real and `_post` sample.
    pub fn mapper(&self, key: &EventKey, grid: &TimepointGrid) -> Mapper {
        let hits: HashSet<&SampleId> = self.occurrences_of(key).map(|o| &o.sample).collect();
        grid.patients()
            .iter()
            .filter_map(|p| grid.samples(p).ok())
            .flat_map(|samples| {
                let post = samples.last().map(|s| s.id.post());
                samples.iter().map(|s| s.id.clone()).chain(post)
            })
            .map(|sample| {
                let hit = hits.contains(&sample);
                (sample, Value::Bool(hit))
            })
            .collect()
    }

    /// BINARY occurrence variable of a key.
    pub fn variable(&self, key: &EventKey, grid: &TimepointGrid) -> Result<Variable, ValidationError> {
        let variable = Variable::original(
            key.variable_id()?,
            key.attribute_value.clone(),
            Datatype::Binary,
            VariableCategory::Event,
            self.mapper(key, grid),
        )
        .with_description(format!("{} {}", key.event_type, key.attribute_key));
        Ok(variable)
    }

    /// Occurrence variables of every catalogued key.
    pub fn variables(&self, grid: &TimepointGrid) -> Result<Vec<Variable>, ValidationError> {
        self.catalog.iter().map(|k| self.variable(k, grid)).collect()
    }
}
