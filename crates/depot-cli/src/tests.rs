use std::path::PathBuf;

use depot_core::{CacheStore, PendingRecord, Record, RecordId, SyncOperation, TableRegistry};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::commands::collections::collection_items;
use crate::commands::common::{
    format_record_line, format_timestamp, normalize_collection, normalize_record_id,
    parse_record, pending_to_item, resolve_db_path, source_label, CliContext,
};
use crate::commands::pending::run_pending;
use crate::commands::save::run_save;
use crate::error::CliError;

fn record(value: serde_json::Value) -> Record {
    Record::from_value(value).unwrap()
}

#[test]
fn parse_record_requires_json_object() {
    let parsed = parse_record(r#" {"name": "Acme", "id": 3} "#).unwrap();
    assert_eq!(parsed.id(), Some(RecordId::from(3)));

    assert!(matches!(parse_record("[1, 2]"), Err(CliError::InvalidRecord)));
    assert!(matches!(parse_record("name=Acme"), Err(CliError::InvalidRecord)));
    assert!(matches!(parse_record(""), Err(CliError::InvalidRecord)));
}

#[test]
fn collection_and_id_reject_blank_values() {
    assert_eq!(normalize_collection("  clients ").unwrap(), "clients");
    assert!(matches!(
        normalize_collection("   "),
        Err(CliError::EmptyCollection)
    ));

    assert_eq!(normalize_record_id(" 42 ").unwrap(), RecordId::from(42));
    assert!(matches!(normalize_record_id(""), Err(CliError::EmptyRecordId)));
}

#[test]
fn explicit_db_path_wins() {
    let explicit = PathBuf::from("/tmp/depot-explicit.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn record_line_shows_id_then_fields() {
    let line = format_record_line(&record(json!({
        "id": 7,
        "name": "Acme",
        "createdAt": "2025-01-01T00:00:00.000Z",
        "updatedAt": "2025-01-01T00:00:00.000Z",
        "active": true
    })));
    assert_eq!(line, "7  active=true name=Acme");

    let bare = format_record_line(&record(json!({"id": "v-1"})));
    assert_eq!(bare, "v-1");

    let no_id = format_record_line(&record(json!({"name": "draft"})));
    assert_eq!(no_id, "-  name=draft");
}

#[test]
fn record_line_truncates_long_values() {
    let long = "x".repeat(100);
    let line = format_record_line(&record(json!({"id": 1, "notes": long})));
    assert!(line.ends_with("..."));
    assert!(line.len() < 60);
}

#[test]
fn source_labels() {
    assert_eq!(source_label(true), "remote");
    assert_eq!(source_label(false), "local cache");
}

#[test]
fn pending_item_carries_iso_timestamp() {
    let pending = PendingRecord {
        collection: "trips".to_string(),
        id: RecordId::from("t-1"),
        operation: SyncOperation::Update,
        record: record(json!({"id": "t-1"})),
        marked_at: 1_700_000_000_000,
    };
    let item = pending_to_item(&pending);
    assert_eq!(item.operation, "update");
    assert_eq!(item.marked_at_iso, format_timestamp(1_700_000_000_000));
    assert!(item.marked_at_iso.starts_with("2023-11-14T22:13:20"));
}

#[test]
fn collection_items_flag_aliases() {
    let items = collection_items(&TableRegistry::with_defaults());
    let customers = items.iter().find(|item| item.name == "customers").unwrap();
    assert_eq!(customers.resource, "clients");
    assert!(!customers.synced);

    let clients = items.iter().find(|item| item.name == "clients").unwrap();
    assert!(clients.synced);
}

#[tokio::test]
async fn save_against_unreachable_remote_is_kept_pending() {
    let tmp = tempfile::tempdir().unwrap();
    let context = CliContext {
        db_path: tmp.path().join("cache.db"),
        api_url: Some("http://127.0.0.1:9".to_string()),
    };

    run_save(
        "vehicles",
        r#"{"plate": "KDA 123X"}"#,
        None,
        true,
        &context,
    )
    .await
    .unwrap();

    let cache = CacheStore::open(&context.db_path).unwrap();
    let pending = cache.pending("vehicles");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].operation, SyncOperation::Create);
    assert_eq!(cache.read_all("vehicles").len(), 1);

    run_pending(None, true, &context).unwrap();
}

#[test]
fn pending_on_fresh_cache_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let context = CliContext {
        db_path: tmp.path().join("fresh.db"),
        api_url: None,
    };
    run_pending(Some("clients"), false, &context).unwrap();
    assert!(CacheStore::open(&context.db_path)
        .unwrap()
        .all_pending()
        .is_empty());
}
