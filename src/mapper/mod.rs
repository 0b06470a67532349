//! Record mapping
//!
//! Flattens nested source records into single-level rows and extracts
//! primary keys. Deterministic and total over any JSON-like input: scalars
//! copy through, nested objects join key paths with `_`, arrays serialize
//! to JSON strings unless broken out into child rows.

mod flatten;

#[cfg(test)]
mod tests;

pub use flatten::{flatten, FlatRow};

use crate::config::{BreakoutDef, TableConfig};
use crate::error::{Error, Result};
use crate::types::JsonValue;

/// Index column added to breakout child rows
///
/// Together with the parent key column it forms the child's primary key.
pub const CHILD_INDEX_COLUMN: &str = "_index";

/// A child row produced by an array breakout
#[derive(Debug, Clone)]
pub struct ChildRow {
    /// Destination child table
    pub table: String,
    /// Primary key columns of the child row
    pub primary_key: Vec<String>,
    /// The flattened child row
    pub row: FlatRow,
}

/// One mapped source record: the parent row plus any breakout children
#[derive(Debug, Clone)]
pub struct MappedRecord {
    /// The flattened parent row
    pub row: FlatRow,
    /// Primary key values, in declared column order
    pub key: Vec<String>,
    /// Breakout child rows
    pub children: Vec<ChildRow>,
}

impl MappedRecord {
    /// Primary key rendered as a single string (for key-set tracking)
    pub fn key_string(&self) -> String {
        self.key.join(":")
    }
}

/// Maps raw source records into flat rows for one table
#[derive(Debug, Clone)]
pub struct RecordMapper {
    table: String,
    primary_key: Vec<String>,
    breakout: Vec<BreakoutDef>,
}

impl RecordMapper {
    /// Create a mapper for a table
    pub fn new(table: &TableConfig) -> Self {
        Self {
            table: table.name.clone(),
            primary_key: table.primary_key.clone(),
            breakout: table.breakout.clone(),
        }
    }

    /// Map one source record
    ///
    /// Fails with [`Error::MissingPrimaryKey`] when a declared key column is
    /// absent or null; the caller skips the record and the sync continues.
    pub fn map(&self, record: &JsonValue) -> Result<MappedRecord> {
        // Breakout fields are lifted out before flattening so they do not
        // also appear JSON-encoded on the parent.
        let mut record = record.clone();
        let mut arrays = Vec::new();
        if let JsonValue::Object(map) = &mut record {
            for def in &self.breakout {
                if let Some(value) = map.remove(&def.field) {
                    arrays.push((def, value));
                }
            }
        }

        let row = flatten(&record);
        let key = self.extract_key(&row)?;
        let parent_key = self.parent_key_value(&key);

        let mut children = Vec::new();
        for (def, value) in arrays {
            if let JsonValue::Array(elements) = value {
                for (index, element) in elements.iter().enumerate() {
                    let mut child = flatten(element);
                    child.insert(def.parent_key_column.clone(), parent_key.clone());
                    child.insert(
                        CHILD_INDEX_COLUMN.to_string(),
                        JsonValue::from(index as u64),
                    );
                    children.push(ChildRow {
                        table: def.table.clone(),
                        primary_key: vec![
                            def.parent_key_column.clone(),
                            CHILD_INDEX_COLUMN.to_string(),
                        ],
                        row: child,
                    });
                }
            }
        }

        Ok(MappedRecord { row, key, children })
    }

    /// Read the declared key columns off the flattened row
    fn extract_key(&self, row: &FlatRow) -> Result<Vec<String>> {
        self.primary_key
            .iter()
            .map(|column| {
                match row.get(column) {
                    Some(JsonValue::Null) | None => Err(Error::MissingPrimaryKey {
                        table: self.table.clone(),
                        column: column.clone(),
                    }),
                    Some(JsonValue::String(s)) => Ok(s.clone()),
                    Some(other) => Ok(other.to_string()),
                }
            })
            .collect()
    }

    fn parent_key_value(&self, key: &[String]) -> JsonValue {
        if key.len() == 1 {
            JsonValue::String(key[0].clone())
        } else {
            JsonValue::String(key.join(":"))
        }
    }

    /// Declared primary key columns
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Destination table name
    pub fn table(&self) -> &str {
        &self.table
    }
}
