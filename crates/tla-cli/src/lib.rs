//! Temporal cohort alignment CLI library.
//!
//! This crate provides the command-line interface over `tla-core`.

mod cli;
pub mod commands;
mod config;
pub mod source;

pub use cli::{Cli, Commands, Operator};
pub use config::Config;
