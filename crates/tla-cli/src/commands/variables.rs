//! Variables command: lists the variable catalogue.

use std::fmt::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tla_core::{Datatype, Session, VariableCategory};

use super::util::write_table;

/// Catalogue entry for display.
#[derive(Debug, Clone, Serialize)]
pub struct VariableEntry {
    pub id: String,
    pub name: String,
    pub datatype: Datatype,
    pub category: VariableCategory,
    pub description: String,
    /// Samples with a defined value.
    pub defined: usize,
}

pub fn get_variables(session: &Session) -> Vec<VariableEntry> {
    session
        .cohort()
        .variables()
        .iter()
        .map(|v| VariableEntry {
            id: v.id.to_string(),
            name: v.name.clone(),
            datatype: v.datatype,
            category: v.category,
            description: v.description.clone(),
            defined: v.mapper.len(),
        })
        .collect()
}

pub fn format_variables(entries: &[VariableEntry]) -> Result<String, fmt::Error> {
    let mut output = String::new();
    if entries.is_empty() {
        writeln!(output, "No variables.")?;
        return Ok(output);
    }
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.id.clone(),
                e.name.clone(),
                e.datatype.to_string(),
                e.category.to_string(),
                e.defined.to_string(),
            ]
        })
        .collect();
    write_table(
        &mut output,
        &["ID", "NAME", "TYPE", "CATEGORY", "DEFINED"],
        &rows,
    )?;
    Ok(output)
}

/// Runs the variables command.
pub fn run(session: &Session, json: bool) -> Result<()> {
    let entries = get_variables(session);
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", format_variables(&entries)?);
    }
    Ok(())
}
