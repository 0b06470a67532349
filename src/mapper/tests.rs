//! Tests for the record mapper

use super::*;
use crate::config::{BreakoutDef, TableConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;

fn table(name: &str, primary_key: &[&str]) -> TableConfig {
    TableConfig {
        name: name.to_string(),
        endpoint: format!("/v1/{name}"),
        method: crate::types::Method::GET,
        params: HashMap::new(),
        headers: HashMap::new(),
        record_path: None,
        primary_key: primary_key.iter().map(ToString::to_string).collect(),
        column_types: HashMap::new(),
        pagination: crate::config::PaginationDef::None,
        incremental: None,
        soft_delete: false,
        breakout: Vec::new(),
    }
}

// ============================================================================
// Flatten Tests
// ============================================================================

#[test]
fn test_flatten_scalars_copy_through() {
    let row = flatten(&json!({"id": 1, "name": "a", "active": true, "score": null}));
    assert_eq!(row.get("id"), Some(&json!(1)));
    assert_eq!(row.get("name"), Some(&json!("a")));
    assert_eq!(row.get("active"), Some(&json!(true)));
    assert_eq!(row.get("score"), Some(&json!(null)));
}

#[test]
fn test_flatten_nested_objects_join_with_underscore() {
    let row = flatten(&json!({
        "id": 1,
        "address": {"city": "Berlin", "geo": {"lat": 52.5}}
    }));
    assert_eq!(row.get("address_city"), Some(&json!("Berlin")));
    assert_eq!(row.get("address_geo_lat"), Some(&json!(52.5)));
    assert!(row.get("address").is_none());
}

#[test]
fn test_flatten_arrays_become_json_strings() {
    let row = flatten(&json!({"id": 1, "tags": ["a", "b"], "items": [{"x": 1}]}));
    assert_eq!(row.get("tags"), Some(&json!("[\"a\",\"b\"]")));
    assert_eq!(row.get("items"), Some(&json!("[{\"x\":1}]")));
}

#[test]
fn test_flatten_non_object_top_level() {
    let row = flatten(&json!(42));
    assert_eq!(row.get("value"), Some(&json!(42)));
}

#[test]
fn test_flatten_is_deterministic() {
    let record = json!({"b": {"d": 2, "c": 1}, "a": [3, 4]});
    assert_eq!(flatten(&record), flatten(&record));
}

#[test]
fn test_flatten_keys_are_depth_first_leaf_paths() {
    let row = flatten(&json!({
        "a": {"b": {"c": 1}, "d": 2},
        "e": 3,
        "f": [1, 2]
    }));
    let mut names: Vec<_> = row.column_names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["a_b_c", "a_d", "e", "f"]);
}

// ============================================================================
// RecordMapper Tests
// ============================================================================

#[test]
fn test_map_extracts_primary_key() {
    let mapper = RecordMapper::new(&table("users", &["id"]));
    let mapped = mapper.map(&json!({"id": 42, "name": "a"})).unwrap();

    assert_eq!(mapped.key, vec!["42"]);
    assert_eq!(mapped.key_string(), "42");
    assert!(mapped.children.is_empty());
}

#[test]
fn test_map_composite_primary_key() {
    let mapper = RecordMapper::new(&table("memberships", &["org_id", "user_id"]));
    let mapped = mapper
        .map(&json!({"org_id": "o1", "user_id": "u2"}))
        .unwrap();

    assert_eq!(mapped.key, vec!["o1", "u2"]);
    assert_eq!(mapped.key_string(), "o1:u2");
}

#[test]
fn test_map_missing_primary_key_is_rejected() {
    let mapper = RecordMapper::new(&table("users", &["id"]));

    let err = mapper.map(&json!({"name": "a"})).unwrap_err();
    assert!(matches!(err, Error::MissingPrimaryKey { .. }));

    let err = mapper.map(&json!({"id": null, "name": "a"})).unwrap_err();
    assert!(matches!(err, Error::MissingPrimaryKey { .. }));
}

#[test]
fn test_map_nested_primary_key_path() {
    // Key columns are read off the flattened row, so nested keys work
    // through their underscore-joined name.
    let mapper = RecordMapper::new(&table("events", &["payload_id"]));
    let mapped = mapper.map(&json!({"payload": {"id": 7}})).unwrap();
    assert_eq!(mapped.key, vec!["7"]);
}

#[test]
fn test_map_breakout_children() {
    let mut config = table("orders", &["id"]);
    config.breakout = vec![BreakoutDef {
        field: "items".to_string(),
        table: "order_items".to_string(),
        parent_key_column: "order_id".to_string(),
    }];
    let mapper = RecordMapper::new(&config);

    let mapped = mapper
        .map(&json!({
            "id": "ord_1",
            "total": 10,
            "items": [{"sku": "a", "qty": 1}, {"sku": "b", "qty": 2}]
        }))
        .unwrap();

    // Parent no longer carries the array
    assert!(mapped.row.get("items").is_none());
    assert_eq!(mapped.row.get("total"), Some(&json!(10)));

    assert_eq!(mapped.children.len(), 2);
    let first = &mapped.children[0];
    assert_eq!(first.table, "order_items");
    assert_eq!(first.primary_key, vec!["order_id", CHILD_INDEX_COLUMN]);
    assert_eq!(first.row.get("order_id"), Some(&json!("ord_1")));
    assert_eq!(first.row.get(CHILD_INDEX_COLUMN), Some(&json!(0)));
    assert_eq!(first.row.get("sku"), Some(&json!("a")));

    assert_eq!(mapped.children[1].row.get(CHILD_INDEX_COLUMN), Some(&json!(1)));
}

#[test]
fn test_map_breakout_absent_field_is_fine() {
    let mut config = table("orders", &["id"]);
    config.breakout = vec![BreakoutDef {
        field: "items".to_string(),
        table: "order_items".to_string(),
        parent_key_column: "order_id".to_string(),
    }];
    let mapper = RecordMapper::new(&config);

    let mapped = mapper.map(&json!({"id": "ord_1"})).unwrap();
    assert!(mapped.children.is_empty());
}
