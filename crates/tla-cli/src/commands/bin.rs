//! Bin command: derives a binned variable from a numeric one.

use std::fmt::{self, Write};

use anyhow::{Context, Result, bail};
use tla_core::{Binning, Datatype, Modification, Session, Variable};

use super::grid::format_grid;
use super::util::{value_counts, variable_id, write_table};

/// Derives and displays a binned variable, returning a copy of it.
pub fn apply(
    session: &mut Session,
    variable: &str,
    bins: Vec<f64>,
    names: Vec<String>,
    name: Option<String>,
) -> Result<Variable> {
    let source_id = variable_id(variable)?;
    let source = session
        .variable_by_id(&source_id)
        .with_context(|| format!("cannot bin {variable}"))?;
    if source.datatype != Datatype::Number {
        bail!("cannot bin {variable}: it is {}, not NUMBER", source.datatype);
    }
    let name = name.unwrap_or_else(|| format!("{} binned", source.name));

    let binning = if names.is_empty() {
        Binning::with_range_names(bins)
    } else {
        Binning::new(bins, names)
    }
    .context("invalid bins")?;

    let plan = session.plan(name, &[source_id], Modification::Binning { binning })?;
    let derived = plan.variable().clone();
    session.add_derived(plan)?;
    tracing::debug!(id = %derived.id, name = %derived.name, "added binned variable");
    Ok(derived)
}

/// Formats the per-bin sample counts followed by the grid.
pub fn format_bin(session: &Session, variable: &Variable) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "Added {} ({})", variable.name, variable.datatype)?;
    writeln!(output)?;
    let rows: Vec<Vec<String>> = value_counts(session, variable)
        .into_iter()
        .map(|(bin, count)| vec![bin, count.to_string()])
        .collect();
    write_table(&mut output, &["BIN", "SAMPLES"], &rows)?;
    writeln!(output)?;
    output.push_str(&format_grid(session)?);
    Ok(output)
}

/// Runs the bin command.
pub fn run(
    session: &mut Session,
    variable: &str,
    bins: Vec<f64>,
    names: Vec<String>,
    name: Option<String>,
    json: bool,
) -> Result<()> {
    let derived = apply(session, variable, bins, names, name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&derived)?);
    } else {
        print!("{}", format_bin(session, &derived)?);
    }
    Ok(())
}
