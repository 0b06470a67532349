//! Command-line interface
//!
//! A local debug surface: run one sync pass against a definition and a
//! config file, validate definitions, and inspect state files. The real
//! destination is the platform runtime's concern; the debug command syncs
//! into an in-memory sink and reports operation counts.

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
