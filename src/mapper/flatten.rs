//! Flattening of nested records

use crate::types::{JsonObject, JsonValue};

/// A single-level row: column name to scalar value
///
/// Arrays appear as JSON-encoded strings; nested objects contribute
/// underscore-joined column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRow {
    columns: JsonObject,
}

impl FlatRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a column value
    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.columns.get(column)
    }

    /// Insert a column value
    pub fn insert(&mut self, column: String, value: JsonValue) {
        self.columns.insert(column, value);
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Borrow the underlying column map
    pub fn columns(&self) -> &JsonObject {
        &self.columns
    }

    /// Convert into a JSON object value
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.columns)
    }
}

/// Flatten a source record into a single-level row
///
/// Deterministic and total: scalars copy through, objects recurse with
/// `parent_key` + `_` + key, arrays serialize to a JSON string. A
/// non-object top-level value lands in a single `value` column.
pub fn flatten(record: &JsonValue) -> FlatRow {
    let mut row = FlatRow::new();
    match record {
        JsonValue::Object(map) => {
            for (key, value) in map {
                flatten_into(key, value, &mut row);
            }
        }
        other => flatten_into("value", other, &mut row),
    }
    row
}

fn flatten_into(prefix: &str, value: &JsonValue, row: &mut FlatRow) {
    match value {
        JsonValue::Object(map) => {
            for (key, nested) in map {
                flatten_into(&format!("{prefix}_{key}"), nested, row);
            }
        }
        JsonValue::Array(_) => {
            // Arrays stay intact as JSON text; a breakout relationship is
            // the only way an array becomes rows of its own.
            let encoded = serde_json::to_string(value).unwrap_or_default();
            row.insert(prefix.to_string(), JsonValue::String(encoded));
        }
        scalar => {
            row.insert(prefix.to_string(), scalar.clone());
        }
    }
}
