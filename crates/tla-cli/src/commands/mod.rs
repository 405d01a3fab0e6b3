//! CLI command implementations.

pub mod bin;
pub mod combine;
pub mod events;
pub mod grid;
pub mod util;
pub mod variables;

#[cfg(test)]
mod fixtures;
