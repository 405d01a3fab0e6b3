//! Shared helpers for commands.

use std::fmt::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tla_core::{Cohort, Direction, Domain, EngineConfig, PatientId, Session, Value, Variable, VariableId};

use crate::source::JsonSource;

/// Loads a cohort file into a fresh session.
pub fn load_session(input: &Path, engine: &EngineConfig) -> Result<Session> {
    let source = JsonSource::open(input)?;
    let cohort = Cohort::load(&source, engine)
        .with_context(|| format!("failed to load cohort from {}", input.display()))?;
    Ok(Session::new(cohort))
}

/// A patient move requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSpec {
    pub patient: PatientId,
    pub index: usize,
    pub direction: Direction,
}

/// Parses `PATIENT:INDEX:DIRECTION`.
///
/// Patient ids may contain `:`, so the string is split from the right.
pub fn parse_move(spec: &str) -> Result<MoveSpec> {
    let mut parts = spec.rsplitn(3, ':');
    let (Some(direction), Some(index), Some(patient)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("invalid move {spec:?}, expected PATIENT:INDEX:up|down");
    };
    Ok(MoveSpec {
        patient: PatientId::new(patient).with_context(|| format!("invalid move {spec:?}"))?,
        index: index
            .parse()
            .with_context(|| format!("invalid timepoint index in move {spec:?}"))?,
        direction: direction
            .parse()
            .with_context(|| format!("invalid move {spec:?}"))?,
    })
}

pub fn variable_id(raw: &str) -> Result<VariableId> {
    VariableId::new(raw).context("invalid variable id")
}

/// Renders an optional value for a table cell.
pub fn format_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "-".to_string(), ToString::to_string)
}

/// Counts real samples per domain value, with `-` for samples without one.
pub fn value_counts(session: &Session, variable: &Variable) -> Vec<(String, usize)> {
    let values: Vec<Option<&Value>> = session
        .grid()
        .all_samples()
        .map(|s| variable.mapper.get(&s.id))
        .collect();
    let mut counts: Vec<(String, usize)> = match &variable.domain {
        Domain::Categories { values: categories } => categories
            .iter()
            .map(|c| (c.to_string(), values.iter().filter(|v| **v == Some(c)).count()))
            .collect(),
        Domain::Range { .. } => vec![(
            "defined".to_string(),
            values.iter().filter(|v| v.is_some()).count(),
        )],
    };
    counts.push(("-".to_string(), values.iter().filter(|v| v.is_none()).count()));
    counts
}

/// Writes a left-aligned table with two-space column gaps.
pub fn write_table(out: &mut String, headers: &[&str], rows: &[Vec<String>]) -> fmt::Result {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    write_row(out, headers, &widths)?;
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        write_row(out, &cells, &widths)?;
    }
    Ok(())
}

fn write_row(out: &mut String, cells: &[&str], widths: &[usize]) -> fmt::Result {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i + 1 == cells.len() {
            line.push_str(cell);
        } else {
            let width = widths.get(i).copied().unwrap_or(0);
            write!(line, "{cell:<width$}  ")?;
        }
    }
    writeln!(out, "{}", line.trim_end())
}
