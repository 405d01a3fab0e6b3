//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Temporal cohort alignment.
///
/// Aligns per-patient specimen timelines into shared timepoints, derives
/// variables from clinical attributes, and matches clinical events to the
/// intervals between samples.
#[derive(Debug, Parser)]
#[command(name = "tla", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Cohort JSON document (overrides the configured input).
    #[arg(short, long, global = true)]
    pub input: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the timepoint grid with displayed variables.
    Grid {
        /// Variable ids to display as rows.
        #[arg(short, long = "show", value_name = "VARIABLE")]
        show: Vec<String>,

        /// Move a patient before printing: PATIENT:INDEX:up|down (INDEX is 0-based).
        #[arg(short, long = "move", value_name = "MOVE")]
        moves: Vec<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the variable catalogue.
    Variables {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List event keys, or one patient's matched events.
    Events {
        /// Show the matched occurrences of this patient.
        #[arg(short, long)]
        patient: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Bin a numeric variable.
    Bin {
        /// Variable to bin.
        #[arg(long)]
        variable: String,

        /// Bin boundaries, strictly increasing.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        bins: Vec<f64>,

        /// Bin names; defaults to "a to b" ranges.
        #[arg(long, value_delimiter = ',')]
        names: Vec<String>,

        /// Name of the binned variable.
        #[arg(long)]
        name: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Combine binary variables with a boolean operator.
    Combine {
        /// Variables to combine.
        #[arg(long, value_delimiter = ',', required = true)]
        variables: Vec<String>,

        /// Boolean operator.
        #[arg(long, value_enum, default_value_t = Operator::Or)]
        operator: Operator,

        /// Name of the combined variable.
        #[arg(long)]
        name: Option<String>,

        /// Leave out sources without any value instead of keeping them.
        #[arg(long)]
        exclude_empty: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Boolean operator for `combine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operator {
    And,
    Or,
}

impl From<Operator> for tla_core::CombineOperator {
    fn from(op: Operator) -> Self {
        match op {
            Operator::And => Self::And,
            Operator::Or => Self::Or,
        }
    }
}
