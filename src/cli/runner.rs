//! CLI command execution

use super::commands::{Cli, Commands};
use crate::config::{load_definition, RuntimeConfig};
use crate::driver::{SyncDriver, TableStatus};
use crate::error::{Error, Result};
use crate::sink::{CountingSink, MemorySink};
use crate::state::StateStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Executes CLI commands
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a runner for the parsed CLI
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Execute the selected command
    pub async fn run(self) -> Result<()> {
        match self.cli.command {
            Commands::Debug {
                definition,
                config,
                config_json,
                state,
            } => run_debug(definition, config, config_json, state).await,
            Commands::Validate { definition } => run_validate(definition),
            Commands::State { state } => run_state(state),
        }
    }
}

async fn run_debug(
    definition_path: PathBuf,
    config_path: Option<PathBuf>,
    config_json: Option<String>,
    state_path: Option<PathBuf>,
) -> Result<()> {
    let definition = load_definition(&definition_path)?;
    let config = match (config_json, config_path) {
        (Some(json), _) => RuntimeConfig::from_json_str(&json)?,
        (None, Some(path)) => RuntimeConfig::from_json_file(path)?,
        (None, None) => RuntimeConfig::new(),
    };
    let store = match &state_path {
        Some(path) => StateStore::from_file(path),
        None => StateStore::in_memory(),
    };

    let rows = MemorySink::shared();
    let sink = CountingSink::new(Arc::clone(&rows));
    let driver = SyncDriver::new(definition, &config, store, sink)?;
    let summary = driver.run().await;

    match summary.completed_at {
        Some(at) => println!(
            "Sync pass finished in {}ms at {}",
            summary.duration_ms,
            at.to_rfc3339()
        ),
        None => println!("Sync pass finished in {}ms", summary.duration_ms),
    }
    println!();
    for outcome in &summary.tables {
        let status = match &outcome.status {
            TableStatus::Done => "done".to_string(),
            TableStatus::Interrupted => "interrupted (deadline)".to_string(),
            TableStatus::Failed { error, category } => {
                format!("FAILED: {error} ({})", category.remediation())
            }
        };
        println!(
            "  {:<24} {:>8} rows {:>5} pages {:>5} skipped {:>5} deletes  {status}",
            outcome.table, outcome.rows, outcome.pages, outcome.skipped, outcome.deletes
        );
    }
    println!();
    println!("Operations: {}", driver.sink().counts());
    for table in rows.table_names() {
        println!("  {:<24} {} rows in destination", table, rows.row_count(&table));
    }

    if summary.all_done() {
        Ok(())
    } else {
        Err(Error::Other(format!(
            "{} of {} tables failed",
            summary.failed().count(),
            summary.tables.len()
        )))
    }
}

fn run_validate(definition_path: PathBuf) -> Result<()> {
    let definition = load_definition(&definition_path)?;
    println!(
        "OK: '{}' with {} tables",
        definition.metadata.name,
        definition.tables.len()
    );
    for table in &definition.tables {
        println!(
            "  {:<24} endpoint={} primary_key={:?}",
            table.name, table.endpoint, table.primary_key
        );
    }
    Ok(())
}

fn run_state(state_path: PathBuf) -> Result<()> {
    if !state_path.exists() {
        return Err(Error::FileNotFound {
            path: state_path.display().to_string(),
        });
    }
    let contents = std::fs::read_to_string(&state_path)?;
    let state: crate::state::SyncState = serde_json::from_str(&contents)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
