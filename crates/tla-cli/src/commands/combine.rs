//! Combine command: derives a binary variable from several binary ones.

use std::fmt::{self, Write};

use anyhow::{Result, bail};
use tla_core::{CombineOperator, Datatype, Modification, Session, Variable, VariableId};

use super::grid::format_grid;
use super::util::{value_counts, variable_id, write_table};

/// Derives and displays the combination, returning a copy of it.
///
/// Sources without any defined value are kept unless `exclude_empty` is set.
pub fn apply(
    session: &mut Session,
    variables: &[String],
    operator: CombineOperator,
    name: Option<String>,
    exclude_empty: bool,
) -> Result<Variable> {
    let mut ids: Vec<VariableId> = Vec::with_capacity(variables.len());
    let mut names = Vec::with_capacity(variables.len());
    for raw in variables {
        let id = variable_id(raw)?;
        let source = session.variable_by_id(&id)?;
        if source.datatype != Datatype::Binary {
            bail!("cannot combine {raw}: it is {}, not BINARY", source.datatype);
        }
        names.push(source.name.clone());
        ids.push(id);
    }
    let name = name.unwrap_or_else(|| names.join(&format!(" {operator} ")));

    let mut plan = session.plan(
        name,
        &ids,
        Modification::BinaryCombine {
            operator,
            category_mapping: None,
        },
    )?;
    if plan.has_empty_sources() {
        let empty: Vec<&str> = plan.empty_sources().iter().map(VariableId::as_str).collect();
        if exclude_empty {
            tracing::info!(sources = ?empty, "excluding sources without values");
            plan = plan.excluding_empty_sources()?;
        } else {
            tracing::warn!(sources = ?empty, "combining sources without values");
        }
    }

    let derived = plan.variable().clone();
    session.add_derived(plan)?;
    tracing::debug!(id = %derived.id, name = %derived.name, "added combined variable");
    Ok(derived)
}

/// Formats the value counts followed by the grid.
pub fn format_combine(session: &Session, variable: &Variable) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "Added {} ({})", variable.name, variable.datatype)?;
    writeln!(output)?;
    let rows: Vec<Vec<String>> = value_counts(session, variable)
        .into_iter()
        .map(|(value, count)| vec![value, count.to_string()])
        .collect();
    write_table(&mut output, &["VALUE", "SAMPLES"], &rows)?;
    writeln!(output)?;
    output.push_str(&format_grid(session)?);
    Ok(output)
}

/// Runs the combine command.
pub fn run(
    session: &mut Session,
    variables: &[String],
    operator: CombineOperator,
    name: Option<String>,
    exclude_empty: bool,
    json: bool,
) -> Result<()> {
    let derived = apply(session, variables, operator, name, exclude_empty)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&derived)?);
    } else {
        print!("{}", format_combine(session, &derived)?);
    }
    Ok(())
}
