//! Tests for the sync driver

use super::*;
use crate::config::{load_definition_from_str, RuntimeConfig};
use crate::error::ErrorCategory;
use crate::sink::{CountingSink, MemorySink};
use crate::state::StateStore;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn definition_yaml(base_url: &str, tables: &str) -> String {
    format!(
        r#"
metadata:
  name: test
source:
  base_url: "{base_url}"
tables:
{tables}
"#
    )
}

fn users_table() -> &'static str {
    r#"
  - name: users
    endpoint: /v1/users
    record_path: "$.data"
    primary_key: [id]
    pagination:
      type: offset
      offset_param: offset
      limit_param: limit
"#
}

fn fast_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::new();
    config.set("backoff_initial_ms", "1");
    config.set("backoff_cap_ms", "5");
    config.set("max_attempts", "3");
    config.set("requests_per_second", "10000");
    config
}

fn records(range: std::ops::Range<u64>) -> serde_json::Value {
    json!({
        "data": range
            .map(|i| json!({"id": i, "name": format!("user-{i}")}))
            .collect::<Vec<_>>()
    })
}

async fn mock_offset_page(server: &MockServer, offset: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(query_param("offset", offset))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn driver_with(
    yaml: &str,
    config: &RuntimeConfig,
    store: StateStore,
    sink: Arc<MemorySink>,
) -> SyncDriver<CountingSink<Arc<MemorySink>>> {
    let definition = load_definition_from_str(yaml).unwrap();
    SyncDriver::new(definition, config, store, CountingSink::new(sink))
        .unwrap()
        .with_policy(crate::retry::RetryPolicy::default().without_jitter())
}

// ============================================================================
// Offset pagination end to end
// ============================================================================

#[tokio::test]
async fn test_three_pages_emit_and_checkpoint() {
    let server = MockServer::start().await;
    mock_offset_page(&server, "0", records(0..100)).await;
    mock_offset_page(&server, "100", records(100..200)).await;
    mock_offset_page(&server, "200", records(200..240)).await;

    let sink = MemorySink::shared();
    let store = StateStore::in_memory();
    let driver = driver_with(
        &definition_yaml(&server.uri(), users_table()),
        &fast_config(),
        store.clone(),
        Arc::clone(&sink),
    );

    let summary = driver.run().await;

    assert!(summary.all_done());
    let outcome = summary.table("users").unwrap();
    assert_eq!(outcome.pages, 3);
    assert_eq!(outcome.rows, 240);
    assert_eq!(outcome.checkpoints, 3);

    assert_eq!(sink.row_count("users"), 240);
    assert_eq!(driver.sink().counts().upserts, 240);
    assert_eq!(driver.sink().counts().checkpoints, 3);

    // Final cursor state records the position past the last page
    let cursor = store.load("users").await.unwrap();
    assert_eq!(cursor.offset, Some(240));
}

#[tokio::test]
async fn test_empty_first_page_terminates_without_checkpoint() {
    let server = MockServer::start().await;
    mock_offset_page(&server, "0", json!({"data": []})).await;

    let sink = MemorySink::shared();
    let store = StateStore::in_memory();
    let driver = driver_with(
        &definition_yaml(&server.uri(), users_table()),
        &fast_config(),
        store.clone(),
        Arc::clone(&sink),
    );

    let summary = driver.run().await;

    assert!(summary.all_done());
    let outcome = summary.table("users").unwrap();
    assert_eq!(outcome.pages, 1);
    assert_eq!(outcome.rows, 0);
    assert_eq!(outcome.checkpoints, 0);
    assert!(store.load("users").await.is_none());
}

// ============================================================================
// Resume
// ============================================================================

#[tokio::test]
async fn test_resume_from_stored_offset() {
    let server = MockServer::start().await;
    // Source has 200 records; prior state says 150 were already synced.
    mock_offset_page(&server, "150", records(150..200)).await;

    let sink = MemorySink::shared();
    let store = StateStore::in_memory();
    store
        .save("users", crate::state::CursorState::at_offset(150))
        .await
        .unwrap();

    let driver = driver_with(
        &definition_yaml(&server.uri(), users_table()),
        &fast_config(),
        store.clone(),
        Arc::clone(&sink),
    );

    let summary = driver.run().await;

    assert!(summary.all_done());
    assert_eq!(summary.table("users").unwrap().rows, 50);
    assert_eq!(sink.row_count("users"), 50);
    assert_eq!(store.load("users").await.unwrap().offset, Some(200));
}

// ============================================================================
// Malformed records
// ============================================================================

#[tokio::test]
async fn test_malformed_record_is_skipped_not_fatal() {
    let server = MockServer::start().await;
    let mut data: Vec<_> = (0..10u64)
        .map(|i| json!({"id": i, "name": format!("user-{i}")}))
        .collect();
    data[4] = json!({"name": "no id here"});
    mock_offset_page(&server, "0", json!({"data": data})).await;

    let sink = MemorySink::shared();
    let driver = driver_with(
        &definition_yaml(&server.uri(), users_table()),
        &fast_config(),
        StateStore::in_memory(),
        Arc::clone(&sink),
    );

    let summary = driver.run().await;

    let outcome = summary.table("users").unwrap();
    assert!(outcome.status.is_done());
    assert_eq!(outcome.rows, 9);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(sink.row_count("users"), 9);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_auth_failure_is_isolated_per_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/locked"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records(0..5)))
        .mount(&server)
        .await;

    let tables = r#"
  - name: locked
    endpoint: /v1/locked
    record_path: "$.data"
    primary_key: [id]
  - name: open
    endpoint: /v1/open
    record_path: "$.data"
    primary_key: [id]
"#;
    let sink = MemorySink::shared();
    let store = StateStore::in_memory();
    let driver = driver_with(
        &definition_yaml(&server.uri(), tables),
        &fast_config(),
        store.clone(),
        Arc::clone(&sink),
    );

    let summary = driver.run().await;

    let locked = summary.table("locked").unwrap();
    match &locked.status {
        TableStatus::Failed { category, .. } => {
            assert_eq!(*category, ErrorCategory::Authentication);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(locked.rows, 0);
    assert_eq!(locked.checkpoints, 0);
    assert!(store.load("locked").await.is_none());

    // The sibling table is unaffected
    assert!(summary.table("open").unwrap().status.is_done());
    assert_eq!(sink.row_count("open"), 5);
}

// ============================================================================
// Breakout children
// ============================================================================

#[tokio::test]
async fn test_breakout_emits_child_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "ord_1", "total": 10, "items": [{"sku": "a"}, {"sku": "b"}]},
                {"id": "ord_2", "total": 5, "items": [{"sku": "c"}]}
            ]
        })))
        .mount(&server)
        .await;

    let tables = r#"
  - name: orders
    endpoint: /v1/orders
    record_path: "$.data"
    primary_key: [id]
    breakout:
      - field: items
        table: order_items
        parent_key_column: order_id
"#;
    let sink = MemorySink::shared();
    let driver = driver_with(
        &definition_yaml(&server.uri(), tables),
        &fast_config(),
        StateStore::in_memory(),
        Arc::clone(&sink),
    );

    let summary = driver.run().await;

    assert!(summary.all_done());
    assert_eq!(sink.row_count("orders"), 2);
    assert_eq!(sink.row_count("order_items"), 3);
    // Parent + child upserts both count as rows
    assert_eq!(summary.table("orders").unwrap().rows, 5);

    let item = sink.row("order_items", "ord_1:0").unwrap();
    assert_eq!(item.get("sku"), Some(&json!("a")));
}
