//! Grid command: prints the aligned timepoints.
//!
//! Each row is one patient entry of one timepoint, followed by the values of
//! the displayed variables for that entry's sample.

use std::fmt::{self, Write};

use anyhow::{Context, Result};
use tla_core::Session;

use super::util::{format_value, parse_move, variable_id, write_table};

/// Displays variables and applies moves, in command-line order.
pub fn apply(session: &mut Session, show: &[String], moves: &[String]) -> Result<()> {
    for raw in show {
        let id = variable_id(raw)?;
        session
            .display(&id)
            .with_context(|| format!("cannot display {raw}"))?;
    }
    for raw in moves {
        let spec = parse_move(raw)?;
        session
            .move_patient(&spec.patient, spec.index, spec.direction)
            .with_context(|| format!("cannot apply move {raw}"))?;
        tracing::debug!(patient = %spec.patient, index = spec.index, direction = %spec.direction, "applied move");
    }
    Ok(())
}

/// One-line size summary of the grid.
fn summary(session: &Session) -> String {
    let grid = session.grid();
    let (min, max) = (grid.min_timepoints(), grid.max_timepoints());
    let per_patient = if min == max {
        format!("{min}")
    } else {
        format!("{min}-{max}")
    };
    format!(
        "{} timepoints, {} patients, {per_patient} samples per patient",
        grid.len(),
        grid.patients().len()
    )
}

/// Formats the grid as a table.
pub fn format_grid(session: &Session) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "{}", summary(session))?;
    writeln!(output)?;

    let displayed = session.displayed_variables();
    let mut headers = vec!["TIMEPOINT", "PATIENT", "SAMPLE"];
    headers.extend(displayed.iter().map(|v| v.name.as_str()));

    let mut rows = Vec::new();
    for view in session.timepoints() {
        for (i, (patient, sample)) in view.entries.iter().enumerate() {
            let mut row = vec![view.label.clone(), patient.to_string(), sample.clone()];
            row.extend(
                view.rows
                    .iter()
                    .map(|r| format_value(r.values.get(i).and_then(Option::as_ref))),
            );
            rows.push(row);
        }
    }
    write_table(&mut output, &headers, &rows)?;
    Ok(output)
}

/// Formats the grid as JSON.
pub fn format_grid_json(session: &Session) -> Result<String> {
    Ok(serde_json::to_string_pretty(&session.timepoints())?)
}

/// Runs the grid command.
pub fn run(session: &mut Session, show: &[String], moves: &[String], json: bool) -> Result<()> {
    apply(session, show, moves)?;
    if json {
        println!("{}", format_grid_json(session)?);
    } else {
        print!("{}", format_grid(session)?);
    }
    Ok(())
}
