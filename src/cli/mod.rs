//! Command-line interface for eec
//!
//! Operator front end for the lifecycle core. There is no HTTP layer; each
//! command builds a supervisor over the configured record store.
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions and parsing structures (clap)
//! - `run`: Main entry point and command dispatch
//! - `commands`: Command implementations and helpers
//! - `tests`: Test module (cfg(test) only)

pub mod args;
mod commands;
mod run;

#[cfg(test)]
mod tests;

// Re-export argument types
pub use args::{Cli, Commands, StoreArg, build_cli};

// Re-export run function
pub use run::run;
