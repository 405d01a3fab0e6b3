//! Events command: lists event keys, or one patient's matched events.

use std::fmt::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tla_core::{PatientId, Session};

use super::util::write_table;

/// An event key with its occurrence count.
#[derive(Debug, Clone, Serialize)]
pub struct EventKeyEntry {
    pub event_type: String,
    pub attribute: String,
    pub value: String,
    pub occurrences: usize,
}

/// A matched event of one patient.
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceEntry {
    pub event: String,
    pub sample: String,
    pub start: f64,
    pub end: f64,
}

pub fn get_event_keys(session: &Session) -> Vec<EventKeyEntry> {
    let matcher = session.cohort().matcher();
    matcher
        .catalog()
        .iter()
        .map(|key| EventKeyEntry {
            event_type: key.event_type.clone(),
            attribute: key.attribute_key.clone(),
            value: key.attribute_value.clone(),
            occurrences: matcher.occurrences_of(key).count(),
        })
        .collect()
}

pub fn get_occurrences(session: &Session, patient: &PatientId) -> Vec<OccurrenceEntry> {
    session
        .cohort()
        .matcher()
        .occurrences()
        .iter()
        .filter(|o| o.patient == *patient)
        .map(|o| OccurrenceEntry {
            event: o.key.to_string(),
            sample: o.sample.to_string(),
            start: o.start,
            end: o.end,
        })
        .collect()
}

pub fn format_event_keys(entries: &[EventKeyEntry]) -> Result<String, fmt::Error> {
    let mut output = String::new();
    if entries.is_empty() {
        writeln!(output, "No events.")?;
        return Ok(output);
    }
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.event_type.clone(),
                e.attribute.clone(),
                e.value.clone(),
                e.occurrences.to_string(),
            ]
        })
        .collect();
    write_table(
        &mut output,
        &["TYPE", "ATTRIBUTE", "VALUE", "OCCURRENCES"],
        &rows,
    )?;
    Ok(output)
}

pub fn format_occurrences(
    patient: &PatientId,
    span: Option<(f64, f64)>,
    entries: &[OccurrenceEntry],
) -> Result<String, fmt::Error> {
    let mut output = String::new();
    match span {
        Some((first, last)) => writeln!(output, "{patient}: days {first} to {last}")?,
        None => writeln!(output, "{patient}: no dated data")?,
    }
    writeln!(output)?;
    if entries.is_empty() {
        writeln!(output, "No matched events.")?;
        return Ok(output);
    }
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.event.clone(),
                e.sample.clone(),
                e.start.to_string(),
                e.end.to_string(),
            ]
        })
        .collect();
    write_table(&mut output, &["EVENT", "SAMPLE", "START", "END"], &rows)?;
    Ok(output)
}

/// Runs the events command.
pub fn run(session: &Session, patient: Option<&str>, json: bool) -> Result<()> {
    let Some(raw) = patient else {
        let entries = get_event_keys(session);
        if json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            print!("{}", format_event_keys(&entries)?);
        }
        return Ok(());
    };

    let patient = PatientId::new(raw).context("invalid patient id")?;
    let entries = get_occurrences(session, &patient);
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let span = session.cohort().day_span(&patient);
        print!("{}", format_occurrences(&patient, span, &entries)?);
    }
    Ok(())
}
