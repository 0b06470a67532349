//! State store implementation
//!
//! Provides file-based state persistence with atomic writes.

use super::types::{CursorState, SyncState, STATE_VERSION};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Store for loading and saving per-table cursor state
///
/// Writes are scoped per table key, so concurrent table workers never
/// contend on the same entry; a coarse lock around the whole map is enough.
#[derive(Debug)]
pub struct StateStore {
    /// Path to the state file (empty for in-memory mode)
    path: PathBuf,
    /// Current state (cached)
    state: Arc<RwLock<SyncState>>,
}

impl StateStore {
    /// Create a store backed by the given path, starting empty
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Arc::new(RwLock::new(SyncState::new())),
        }
    }

    /// Create an in-memory store (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(SyncState::new())),
        }
    }

    /// Open a store from a file, loading existing state if present
    ///
    /// Corrupt or version-mismatched state is not an error: it degrades to
    /// an empty state (full sync) with a logged warning.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str::<SyncState>(&contents) {
                    Ok(state) if state.version == STATE_VERSION => state,
                    Ok(state) => {
                        warn!(
                            found = state.version,
                            expected = STATE_VERSION,
                            "state file version mismatch; starting from empty state"
                        );
                        SyncState::new()
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "unreadable state file; starting from empty state"
                        );
                        SyncState::new()
                    }
                },
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "could not read state file; starting from empty state"
                    );
                    SyncState::new()
                }
            }
        } else {
            SyncState::new()
        };

        Self {
            path,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Load cursor state for a table
    pub async fn load(&self, table: &str) -> Option<CursorState> {
        let state = self.state.read().await;
        state.get(table).cloned()
    }

    /// Save cursor state for a table and persist
    ///
    /// Only the sync driver calls this, and only after the rows covered by
    /// this cursor have been emitted.
    pub async fn save(&self, table: &str, cursor: CursorState) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.set(table, cursor);
        }
        self.persist().await
    }

    /// Remove a table's cursor state and persist
    pub async fn clear_table(&self, table: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.remove(table);
        }
        self.persist().await
    }

    /// Remove all state and persist
    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            *state = SyncState::new();
        }
        self.persist().await
    }

    /// Snapshot the full state (the checkpoint blob handed to the sink)
    pub async fn snapshot(&self) -> SyncState {
        self.state.read().await.clone()
    }

    /// Export state as pretty-printed JSON
    pub async fn to_json_pretty(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string_pretty(&*state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })
    }

    /// Write current state to the backing file
    async fn persist(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(()); // In-memory mode
        }

        let contents = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&*state).map_err(|e| Error::State {
                message: format!("Failed to serialize state: {e}"),
            })?
        };

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to write state file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to rename state file: {e}"),
            })?;

        Ok(())
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Clone for StateStore {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
        }
    }
}
