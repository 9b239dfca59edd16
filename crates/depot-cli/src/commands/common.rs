use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use depot_core::models::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use depot_core::{
    CacheStore, PendingRecord, Record, RecordId, SyncCoordinator, SyncSettings, TableRegistry,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

const FIELD_PREVIEW_CHARS: usize = 40;

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub db_path: PathBuf,
    pub api_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub collection: String,
    pub id: String,
    pub operation: String,
    pub marked_at: i64,
    pub marked_at_iso: String,
    pub record: Record,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("DEPOT_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depot")
        .join("cache.db")
}

pub fn load_settings(api_url: Option<&str>) -> Result<SyncSettings, CliError> {
    let settings = SyncSettings::from_env()?;
    match api_url {
        Some(url) => Ok(settings.with_api_url(url)?),
        None => Ok(settings),
    }
}

pub fn open_cache(db_path: &Path) -> Result<CacheStore, CliError> {
    Ok(CacheStore::open(db_path)?)
}

pub fn open_coordinator(context: &CliContext) -> Result<SyncCoordinator, CliError> {
    let settings = load_settings(context.api_url.as_deref())?;
    let cache = open_cache(&context.db_path)?;
    tracing::debug!(db_path = %context.db_path.display(), api_url = %settings.api_url, "Opening coordinator");
    Ok(SyncCoordinator::connect(
        settings,
        TableRegistry::with_defaults(),
        cache,
    )?)
}

pub fn normalize_collection(raw: &str) -> Result<String, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyCollection)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_record_id(raw: &str) -> Result<RecordId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(RecordId::from(trimmed))
    }
}

/// Record JSON from the argument, or from stdin when the argument is `-`.
pub fn read_record_input(raw: &str) -> Result<String, CliError> {
    if raw.trim() != "-" {
        return Ok(raw.to_string());
    }

    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::InvalidRecord);
    }
    let mut buffer = String::new();
    stdin.read_to_string(&mut buffer)?;
    Ok(buffer)
}

pub fn parse_record(raw: &str) -> Result<Record, CliError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|_| CliError::InvalidRecord)?;
    Record::from_value(value).ok_or(CliError::InvalidRecord)
}

/// Where a result came from, for human output.
pub const fn source_label(synced: bool) -> &'static str {
    if synced {
        "remote"
    } else {
        "local cache"
    }
}

/// One-line summary: the id followed by the other fields.
pub fn format_record_line(record: &Record) -> String {
    let id = record
        .id()
        .map_or_else(|| "-".to_string(), |id| id.to_string());

    let fields = record
        .as_map()
        .iter()
        .filter(|(key, _)| {
            !matches!(key.as_str(), ID_FIELD | CREATED_AT_FIELD | UPDATED_AT_FIELD)
        })
        .map(|(key, value)| format!("{key}={}", preview_value(value)))
        .collect::<Vec<_>>();

    if fields.is_empty() {
        id
    } else {
        format!("{id}  {}", fields.join(" "))
    }
}

fn preview_value(value: &Value) -> String {
    let text = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > FIELD_PREVIEW_CHARS {
        let truncated: String = text.chars().take(FIELD_PREVIEW_CHARS - 3).collect();
        format!("{truncated}...")
    } else {
        text
    }
}

pub fn pending_to_item(pending: &PendingRecord) -> PendingItem {
    PendingItem {
        collection: pending.collection.clone(),
        id: pending.id.to_string(),
        operation: pending.operation.to_string(),
        marked_at: pending.marked_at,
        marked_at_iso: format_timestamp(pending.marked_at),
        record: pending.record.clone(),
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map_or_else(|| timestamp_ms.to_string(), |dt| dt.to_rfc3339())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
