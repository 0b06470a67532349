//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Current on-disk state layout version
pub const STATE_VERSION: u32 = 1;

/// Per-table progress marker
///
/// Exactly which fields are populated depends on the table's pagination
/// strategy and whether it tracks soft deletes; the store treats the whole
/// thing as opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorState {
    /// Incremental cursor or page token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,

    /// Numeric offset into the source collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    /// Page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Next-page URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_url: Option<String>,

    /// Incremental watermark: highest cursor-field value from the last
    /// completed pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,

    /// Keys seen in the last completed pass (soft-delete tracking)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_keys: Option<BTreeSet<String>>,
}

impl CursorState {
    /// Create an empty cursor state
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor state holding only an offset
    pub fn at_offset(offset: u64) -> Self {
        Self {
            offset: Some(offset),
            ..Default::default()
        }
    }

    /// Cursor state holding only a cursor value
    pub fn at_cursor(cursor: impl Into<String>) -> Self {
        Self {
            cursor: Some(cursor.into()),
            ..Default::default()
        }
    }

    /// Check whether any progress is recorded
    pub fn is_empty(&self) -> bool {
        self.cursor.is_none()
            && self.offset.is_none()
            && self.page.is_none()
            && self.next_url.is_none()
            && self.watermark.is_none()
            && self.known_keys.is_none()
    }

    /// Check whether a pagination position is recorded (mid-sync state)
    pub fn has_position(&self) -> bool {
        self.cursor.is_some()
            || self.offset.is_some()
            || self.page.is_some()
            || self.next_url.is_some()
    }
}

/// Complete persisted state: a versioned mapping from table name to cursor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    /// Layout version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Per-table cursor state
    #[serde(default)]
    pub tables: HashMap<String, CursorState>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            tables: HashMap::new(),
        }
    }
}

impl SyncState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cursor state for a table
    pub fn get(&self, table: &str) -> Option<&CursorState> {
        self.tables.get(table)
    }

    /// Set cursor state for a table
    pub fn set(&mut self, table: impl Into<String>, cursor: CursorState) {
        self.tables.insert(table.into(), cursor);
    }

    /// Remove a table's cursor state
    pub fn remove(&mut self, table: &str) -> Option<CursorState> {
        self.tables.remove(table)
    }
}
