//! Caller-facing results of coordinator operations

use serde::Serialize;

use super::Record;

/// Result of `save`.
///
/// `success` means the data was preserved somewhere. Only `synced` says
/// whether the remote has it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub success: bool,
    pub data: Record,
    pub synced: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl SaveOutcome {
    pub const fn synced(data: Record) -> Self {
        Self {
            success: true,
            data,
            synced: true,
            fallback: false,
        }
    }

    pub const fn fallback(data: Record, preserved: bool) -> Self {
        Self {
            success: preserved,
            data,
            synced: false,
            fallback: true,
        }
    }
}

/// Result of `load`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    pub data: Vec<Record>,
    pub synced: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

/// Result of `fetch` for a single record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub data: Option<Record>,
    pub synced: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

/// Result of `delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub success: bool,
    pub synced: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

/// Result of replaying persisted pending records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    /// Records the remote accepted
    pub flushed: usize,
    /// Records whose replay failed; they stay pending
    pub failed: usize,
    /// Records left to the retry queue, which already holds a task for them
    pub skipped: usize,
}

/// Notification emitted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A full resync finished; lists the collections that came from the remote.
    DataSynced { collections: Vec<String> },
}
