//! Tests for the state store

use super::*;
use tempfile::tempdir;

#[tokio::test]
async fn test_in_memory_roundtrip() {
    let store = StateStore::in_memory();
    assert!(store.is_in_memory());
    assert!(store.load("users").await.is_none());

    store
        .save("users", CursorState::at_offset(100))
        .await
        .unwrap();
    assert_eq!(store.load("users").await.unwrap().offset, Some(100));
}

#[tokio::test]
async fn test_save_persists_and_reloads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = StateStore::new(&path);
    store
        .save("users", CursorState::at_cursor("abc"))
        .await
        .unwrap();
    store
        .save("orders", CursorState::at_offset(240))
        .await
        .unwrap();

    let reopened = StateStore::from_file(&path);
    assert_eq!(
        reopened.load("users").await.unwrap().cursor.as_deref(),
        Some("abc")
    );
    assert_eq!(reopened.load("orders").await.unwrap().offset, Some(240));
}

#[tokio::test]
async fn test_tables_are_independent() {
    let store = StateStore::in_memory();
    store
        .save("users", CursorState::at_offset(10))
        .await
        .unwrap();
    store
        .save("orders", CursorState::at_offset(20))
        .await
        .unwrap();

    store.clear_table("users").await.unwrap();
    assert!(store.load("users").await.is_none());
    assert_eq!(store.load("orders").await.unwrap().offset, Some(20));
}

#[tokio::test]
async fn test_corrupt_state_degrades_to_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = StateStore::from_file(&path);
    assert!(store.load("users").await.is_none());
}

#[tokio::test]
async fn test_version_mismatch_degrades_to_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{"version": 99, "tables": {"users": {"offset": 5}}}"#,
    )
    .unwrap();

    let store = StateStore::from_file(&path);
    assert!(store.load("users").await.is_none());
}

#[tokio::test]
async fn test_missing_file_is_empty_state() {
    let dir = tempdir().unwrap();
    let store = StateStore::from_file(dir.path().join("nope.json"));
    assert!(store.load("users").await.is_none());
}

#[tokio::test]
async fn test_snapshot_includes_all_tables() {
    let store = StateStore::in_memory();
    store
        .save("users", CursorState::at_offset(1))
        .await
        .unwrap();
    store
        .save("orders", CursorState::at_cursor("c"))
        .await
        .unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.tables.len(), 2);
    assert_eq!(snapshot.version, STATE_VERSION);
}
