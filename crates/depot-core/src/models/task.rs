//! Sync task model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Record, RecordId};

/// The write a task replays against the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Operation that survives when `next` is queued behind `self` for the
    /// same record. `None` means the two cancel out.
    pub const fn coalesce(self, next: Self) -> Option<Self> {
        match (self, next) {
            // The record never reached the remote; nothing to delete there.
            (Self::Create, Self::Delete) => None,
            (Self::Create, Self::Create | Self::Update) => Some(Self::Create),
            (Self::Update, Self::Create | Self::Update) => Some(Self::Update),
            (Self::Update | Self::Delete, Self::Delete) => Some(Self::Delete),
            (Self::Delete, other) => Some(other),
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown sync operation: {other}")),
        }
    }
}

/// A write that failed remotely and waits in the retry queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTask {
    /// Logical collection name used by the caller
    pub collection: String,
    pub operation: SyncOperation,
    /// Snapshot of the record as the caller last wrote it
    pub record: Record,
    /// Failed replays so far; the original failed write is not counted
    pub retry_count: u32,
    pub last_error: Option<String>,
    /// Unix ms
    pub enqueued_at: i64,
}

impl SyncTask {
    /// Create a fresh task for a write that just failed.
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        operation: SyncOperation,
        record: Record,
        error: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            operation,
            record,
            retry_count: 0,
            last_error: Some(error.into()),
            enqueued_at: crate::util::unix_timestamp_millis(),
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record.id()
    }

    /// Whether this task targets `id` in `collection`.
    pub fn targets(&self, collection: &str, id: &RecordId) -> bool {
        self.collection == collection && self.record_id().as_ref() == Some(id)
    }
}
