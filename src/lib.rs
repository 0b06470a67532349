//! # synckit
//!
//! A Rust-native toolkit for building incremental API sync connectors.
//! One generic pagination/checkpoint/retry loop instead of a hand-rolled
//! copy per connector.
//!
//! ## Features
//!
//! - **Single-shot HTTP adapter**: auth, bounded timeouts, and rate
//!   limiting on every request; no hidden retries
//! - **Pure retry policy**: exponential backoff with cap and jitter,
//!   server-directed waits for rate limits, immediate give-up on
//!   permanent failures
//! - **Pluggable pagination**: offset, page number, cursor/keyset, and
//!   next-link strategies behind one trait, all resumable mid-sequence
//! - **Record mapping**: deterministic flattening, primary-key
//!   extraction, and array breakout into child tables
//! - **Checkpointed state**: versioned per-table cursors saved only after
//!   rows are emitted, so a crash never skips data
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use synckit::config::{load_definition, RuntimeConfig};
//! use synckit::driver::SyncDriver;
//! use synckit::sink::MemorySink;
//! use synckit::state::StateStore;
//!
//! #[tokio::main]
//! async fn main() -> synckit::Result<()> {
//!     let definition = load_definition("definitions/pipedrive.yaml")?;
//!     let config = RuntimeConfig::from_json_file("config.json")?;
//!     let store = StateStore::from_file("state.json");
//!
//!     let driver = SyncDriver::new(definition, &config, store, MemorySink::shared())?;
//!     let summary = driver.run().await;
//!
//!     for table in &summary.tables {
//!         println!("{}: {} rows", table.table, table.rows);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Sync Driver                            │
//! │  resume → fetch page → map records → emit → checkpoint → loop   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Paginate    │    Map    │    State    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ API Key  │ One shot  │ Offset        │ Flatten   │ Versioned   │
//! │ Bearer   │ Rate limit│ Page number   │ Key check │ Per table   │
//! │ Basic    │ Retry via │ Cursor        │ Breakout  │ Atomic save │
//! │          │  policy   │ Next link     │           │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration and sync definitions
pub mod config;

/// Authentication for source API requests
pub mod auth;

/// HTTP client adapter with rate limiting
pub mod http;

/// Retry policy
pub mod retry;

/// Pagination strategies
pub mod pagination;

/// Response field and record extraction
pub mod extract;

/// Record flattening and primary-key extraction
pub mod mapper;

/// Checkpoint state store
pub mod state;

/// Destination sink interface
pub mod sink;

/// Sync driver
pub mod driver;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{load_definition, load_definition_from_str, SyncDefinition};
pub use driver::{SyncDriver, SyncSummary};
pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
