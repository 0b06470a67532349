//! Response field and record extraction
//!
//! Simple dot-notation paths cover the common envelope shapes; wildcard
//! patterns fall through to jsonpath-rust.

use crate::error::{Error, Result};
use serde_json::Value;

/// Extract a scalar from JSON using a simple path expression
///
/// Supports basic paths like "$.meta.next_cursor" or "meta.next_cursor".
pub fn extract_string(value: &Value, path: &str) -> Option<String> {
    match extract_value(value, path)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract a value from JSON using a simple dot-notation path
pub fn extract_value(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    Some(current.clone())
}

/// Extract the record array from a response envelope
///
/// With no path, an array body is the record list and any other body is a
/// single record. Wildcard paths are handled by jsonpath-rust.
pub fn extract_records(value: &Value, path: Option<&str>) -> Result<Vec<Value>> {
    match path {
        Some(path) => {
            if path.contains('*') {
                extract_with_jsonpath(value, path)
            } else {
                match extract_value(value, path) {
                    Some(Value::Array(arr)) => Ok(arr),
                    Some(Value::Null) | None => Ok(vec![]),
                    Some(v) => Ok(vec![v]),
                }
            }
        }
        None => match value {
            Value::Array(arr) => Ok(arr.clone()),
            Value::Null => Ok(vec![]),
            _ => Ok(vec![value.clone()]),
        },
    }
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::RecordExtraction {
        path: path.to_string(),
        message: format!("Invalid JSONPath: {e}"),
    })?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
