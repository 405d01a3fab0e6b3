use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tla_cli::commands::{bin, combine, events, grid, util, variables};
use tla_cli::{Cli, Commands, Config};
use tla_core::Session;

/// Load config and open the cohort named by `--input` or the config.
fn open_session(cli: &Cli) -> Result<Session> {
    let mut config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.verbose {
        config.engine.verbose = true;
    }
    tracing::debug!(?config, "loaded configuration");

    let input = cli
        .input
        .as_deref()
        .or(config.input.as_deref())
        .context("no cohort given, pass --input or set input in the config file")?;
    let session = util::load_session(input, &config.engine)?;
    tracing::debug!(path = %input.display(), "opened cohort");
    Ok(session)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Grid { show, moves, json }) => {
            let mut session = open_session(&cli)?;
            grid::run(&mut session, show, moves, *json)?;
        }
        Some(Commands::Variables { json }) => {
            let session = open_session(&cli)?;
            variables::run(&session, *json)?;
        }
        Some(Commands::Events { patient, json }) => {
            let session = open_session(&cli)?;
            events::run(&session, patient.as_deref(), *json)?;
        }
        Some(Commands::Bin {
            variable,
            bins,
            names,
            name,
            json,
        }) => {
            let mut session = open_session(&cli)?;
            bin::run(
                &mut session,
                variable,
                bins.clone(),
                names.clone(),
                name.clone(),
                *json,
            )?;
        }
        Some(Commands::Combine {
            variables,
            operator,
            name,
            exclude_empty,
            json,
        }) => {
            let mut session = open_session(&cli)?;
            combine::run(
                &mut session,
                variables,
                (*operator).into(),
                name.clone(),
                *exclude_empty,
                *json,
            )?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
