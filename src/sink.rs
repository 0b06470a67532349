//! Destination sink interface
//!
//! The warehouse side of a sync is an external collaborator; the driver
//! only calls `upsert`/`update`/`delete`/`checkpoint` on this trait. An
//! in-memory implementation backs tests and the local debug command, and a
//! counting wrapper exposes the operation totals the debug surface reports.

use crate::error::Result;
use crate::mapper::FlatRow;
use crate::state::SyncState;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Destination-side operations the driver emits
///
/// Implementations must make `upsert` idempotent keyed by primary key:
/// re-emitting a row must not duplicate it.
#[async_trait]
pub trait DestinationSink: Send + Sync {
    /// Insert or replace a row keyed by primary key
    async fn upsert(&self, table: &str, primary_key: &[String], row: FlatRow) -> Result<()>;

    /// Merge a partial row into an existing row
    async fn update(&self, table: &str, primary_key: &[String], partial: FlatRow) -> Result<()>;

    /// Delete the row identified by the key columns in `key`
    async fn delete(&self, table: &str, primary_key: &[String], key: FlatRow) -> Result<()>;

    /// Persist the sync state blob
    async fn checkpoint(&self, state: &SyncState) -> Result<()>;
}

/// Render a row's primary key as a single map key
fn key_of(row: &FlatRow, primary_key: &[String]) -> String {
    primary_key
        .iter()
        .map(|column| match row.get(column) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "null".to_string(),
        })
        .collect::<Vec<_>>()
        .join(":")
}

// ============================================================================
// Operation Counts
// ============================================================================

/// Totals of destination operations emitted during a sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub upserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub checkpoints: u64,
}

impl std::fmt::Display for OpCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} upserts, {} updates, {} deletes, {} checkpoints",
            self.upserts, self.updates, self.deletes, self.checkpoints
        )
    }
}

/// Wraps any sink and counts the operations flowing through it
pub struct CountingSink<S> {
    inner: S,
    upserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    checkpoints: AtomicU64,
}

impl<S> CountingSink<S> {
    /// Wrap a sink
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            upserts: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            checkpoints: AtomicU64::new(0),
        }
    }

    /// Current operation totals
    pub fn counts(&self) -> OpCounts {
        OpCounts {
            upserts: self.upserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            checkpoints: self.checkpoints.load(Ordering::Relaxed),
        }
    }

    /// Borrow the wrapped sink
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: DestinationSink> DestinationSink for CountingSink<S> {
    async fn upsert(&self, table: &str, primary_key: &[String], row: FlatRow) -> Result<()> {
        self.inner.upsert(table, primary_key, row).await?;
        self.upserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn update(&self, table: &str, primary_key: &[String], partial: FlatRow) -> Result<()> {
        self.inner.update(table, primary_key, partial).await?;
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, table: &str, primary_key: &[String], key: FlatRow) -> Result<()> {
        self.inner.delete(table, primary_key, key).await?;
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn checkpoint(&self, state: &SyncState) -> Result<()> {
        self.inner.checkpoint(state).await?;
        self.checkpoints.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ============================================================================
// Memory Sink
// ============================================================================

/// In-memory sink keyed by primary key
///
/// Upserts replace by key, which makes re-emission idempotent; used by
/// tests and the local debug command.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, BTreeMap<String, FlatRow>>>,
    checkpoints: Mutex<Vec<SyncState>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared handle
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of rows currently held for a table
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or(0, BTreeMap::len)
    }

    /// All rows for a table, ordered by key
    pub fn rows(&self, table: &str) -> Vec<FlatRow> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Look up a row by its rendered key
    pub fn row(&self, table: &str, key: &str) -> Option<FlatRow> {
        self.tables.lock().unwrap().get(table)?.get(key).cloned()
    }

    /// Table names with at least one row
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Checkpointed state blobs, in order
    pub fn checkpoints(&self) -> Vec<SyncState> {
        self.checkpoints.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationSink for MemorySink {
    async fn upsert(&self, table: &str, primary_key: &[String], row: FlatRow) -> Result<()> {
        let key = key_of(&row, primary_key);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .insert(key, row);
        Ok(())
    }

    async fn update(&self, table: &str, primary_key: &[String], partial: FlatRow) -> Result<()> {
        let key = key_of(&partial, primary_key);
        let mut tables = self.tables.lock().unwrap();
        if let Some(existing) = tables.entry(table.to_string()).or_default().get_mut(&key) {
            for (column, value) in partial.columns() {
                existing.insert(column.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, primary_key: &[String], key: FlatRow) -> Result<()> {
        let key = key_of(&key, primary_key);
        if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
            rows.remove(&key);
        }
        Ok(())
    }

    async fn checkpoint(&self, state: &SyncState) -> Result<()> {
        self.checkpoints.lock().unwrap().push(state.clone());
        Ok(())
    }
}

#[async_trait]
impl<S: DestinationSink + ?Sized> DestinationSink for Arc<S> {
    async fn upsert(&self, table: &str, primary_key: &[String], row: FlatRow) -> Result<()> {
        (**self).upsert(table, primary_key, row).await
    }

    async fn update(&self, table: &str, primary_key: &[String], partial: FlatRow) -> Result<()> {
        (**self).update(table, primary_key, partial).await
    }

    async fn delete(&self, table: &str, primary_key: &[String], key: FlatRow) -> Result<()> {
        (**self).delete(table, primary_key, key).await
    }

    async fn checkpoint(&self, state: &SyncState) -> Result<()> {
        (**self).checkpoint(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> FlatRow {
        let mut row = FlatRow::new();
        for (k, v) in pairs {
            row.insert((*k).to_string(), v.clone());
        }
        row
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let sink = MemorySink::new();
        let pk = vec!["id".to_string()];

        sink.upsert("users", &pk, row(&[("id", json!(1)), ("name", json!("a"))]))
            .await
            .unwrap();
        sink.upsert("users", &pk, row(&[("id", json!(1)), ("name", json!("b"))]))
            .await
            .unwrap();

        assert_eq!(sink.row_count("users"), 1);
        assert_eq!(
            sink.row("users", "1").unwrap().get("name"),
            Some(&json!("b"))
        );
    }

    #[tokio::test]
    async fn test_update_merges_columns() {
        let sink = MemorySink::new();
        let pk = vec!["id".to_string()];

        sink.upsert("users", &pk, row(&[("id", json!(1)), ("name", json!("a"))]))
            .await
            .unwrap();
        sink.update("users", &pk, row(&[("id", json!(1)), ("active", json!(false))]))
            .await
            .unwrap();

        let stored = sink.row("users", "1").unwrap();
        assert_eq!(stored.get("name"), Some(&json!("a")));
        assert_eq!(stored.get("active"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let sink = MemorySink::new();
        let pk = vec!["id".to_string()];

        sink.upsert("users", &pk, row(&[("id", json!(1))]))
            .await
            .unwrap();
        sink.delete("users", &pk, row(&[("id", json!(1))]))
            .await
            .unwrap();

        assert_eq!(sink.row_count("users"), 0);
    }

    #[tokio::test]
    async fn test_counting_sink_counts() {
        let sink = CountingSink::new(MemorySink::new());
        let pk = vec!["id".to_string()];

        sink.upsert("users", &pk, row(&[("id", json!(1))]))
            .await
            .unwrap();
        sink.upsert("users", &pk, row(&[("id", json!(2))]))
            .await
            .unwrap();
        sink.delete("users", &pk, row(&[("id", json!(1))]))
            .await
            .unwrap();
        sink.checkpoint(&SyncState::new()).await.unwrap();

        let counts = sink.counts();
        assert_eq!(counts.upserts, 2);
        assert_eq!(counts.deletes, 1);
        assert_eq!(counts.checkpoints, 1);
        assert_eq!(counts.updates, 0);
    }

    #[test]
    fn test_composite_key_rendering() {
        let r = row(&[("org_id", json!("o1")), ("user_id", json!(7))]);
        assert_eq!(
            key_of(&r, &["org_id".to_string(), "user_id".to_string()]),
            "o1:7"
        );
    }
}
