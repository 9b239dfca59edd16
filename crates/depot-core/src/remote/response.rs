//! Classification of remote payloads into records or typed errors.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::models::Record;
use crate::util::compact_text;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<Value>,
    message: Option<String>,
}

/// Human-readable message for a failed response body.
pub fn parse_api_error(status: u16, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = payload.message {
            return compact_text(&message);
        }
        match payload.error {
            Some(Value::String(error)) => return compact_text(&error),
            Some(Value::Object(error)) => {
                if let Some(Value::String(message)) = error.get("message") {
                    return compact_text(message);
                }
            }
            _ => {}
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed
    }
}

/// Strip a `{success, data}` envelope.
///
/// A bare payload passes through. An envelope reporting `success: false`
/// becomes a server error even though the status was 2xx.
pub fn unwrap_envelope(status: u16, value: Value) -> SyncResult<Value> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    match map.get("success") {
        Some(Value::Bool(false)) => {
            let body = Value::Object(map).to_string();
            Err(SyncError::Server {
                status,
                message: parse_api_error(status, &body),
            })
        }
        Some(Value::Bool(true)) if map.contains_key("data") => {
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        _ => Ok(Value::Object(map)),
    }
}

/// Accept an array of objects as a record list.
pub fn expect_records(value: Value) -> SyncResult<Vec<Record>> {
    let Value::Array(items) = value else {
        return Err(SyncError::MalformedResponse(format!(
            "expected an array of records, got {}",
            shape_of(&value)
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let shape = shape_of(&item);
            Record::from_value(item).ok_or_else(|| {
                SyncError::MalformedResponse(format!("list item {index} is {shape}, not a record"))
            })
        })
        .collect()
}

/// Accept a non-empty object as a record.
pub fn expect_record(value: Value) -> SyncResult<Record> {
    let shape = shape_of(&value);
    match Record::from_value(value) {
        Some(record) if !record.is_empty() => Ok(record),
        Some(_) => Err(SyncError::MalformedResponse(
            "expected a record, got an empty object".to_string(),
        )),
        None => Err(SyncError::MalformedResponse(format!(
            "expected a record, got {shape}"
        ))),
    }
}

/// Whether a health payload carries an explicit success indicator.
pub fn is_healthy_payload(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            matches!(map.get("success"), Some(Value::Bool(true)))
                || matches!(map.get("status"), Some(Value::String(status)) if status.eq_ignore_ascii_case("ok"))
        }
        _ => false,
    }
}

const fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
