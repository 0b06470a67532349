//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// synckit CLI
#[derive(Parser, Debug)]
#[command(name = "synckit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sync pass locally and report operation counts
    Debug {
        /// Sync definition file (YAML)
        #[arg(short, long)]
        definition: PathBuf,

        /// Runtime configuration file (flat JSON object)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Inline runtime config JSON
        #[arg(long)]
        config_json: Option<String>,

        /// State file (JSON); omitted means a fresh in-memory state
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Validate a sync definition
    Validate {
        /// Sync definition file (YAML)
        #[arg(short, long)]
        definition: PathBuf,
    },

    /// Print a state file
    State {
        /// State file (JSON)
        #[arg(short, long)]
        state: PathBuf,
    },
}
