//! Record model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "id";
/// Field holding the creation timestamp.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Field holding the last write timestamp.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Identifier of a record within a collection.
///
/// Remote stores hand out either strings or integers; both are compared by
/// their string form, so `7` and `"7"` name the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Build an id from a JSON value, accepting non-empty strings and numbers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self(text.trim().to_string())),
            Value::Number(number) => Some(Self(number.to_string())),
            _ => None,
        }
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// An open map of fields identified by `id`.
///
/// The payload is whatever the caller or the remote put in it; only `id`,
/// `createdAt` and `updatedAt` carry meaning for the sync layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, rejecting anything that is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Unwrap into a plain JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The record's identifier, if it carries a usable one.
    pub fn id(&self) -> Option<RecordId> {
        self.0.get(ID_FIELD).and_then(RecordId::from_value)
    }

    /// Set the record's identifier.
    pub fn set_id(&mut self, id: impl Into<Value>) {
        self.0.insert(ID_FIELD.to_string(), id.into());
    }

    /// Stamp timestamps for a write that only reached the local cache.
    ///
    /// `updatedAt` always moves; `createdAt` is only filled when missing.
    pub fn stamp_local_write(&mut self, now: &str) {
        self.0
            .entry(CREATED_AT_FIELD)
            .or_insert_with(|| Value::String(now.to_string()));
        self.0
            .insert(UPDATED_AT_FIELD.to_string(), Value::String(now.to_string()));
    }

    /// Whether the payload says it was produced by a fallback path or
    /// carries an error, rather than being a genuine stored record.
    pub fn is_fallback_marked(&self) -> bool {
        let fallback = matches!(self.0.get("fallback"), Some(Value::Bool(true)));
        let error = self.0.get("error").is_some_and(|value| !value.is_null());
        fallback || error
    }
}

impl From<Map<String, Value>> for Record {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        value.into_value()
    }
}

/// Position of the record with `id` in `records`, compared by string form.
pub fn position_of(records: &[Record], id: &RecordId) -> Option<usize> {
    records
        .iter()
        .position(|record| record.id().as_ref() == Some(id))
}
