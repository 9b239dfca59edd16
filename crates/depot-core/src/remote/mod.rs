//! Remote store access.
//!
//! Every failure is returned as a [`SyncError`](crate::SyncError) value; nothing
//! in this layer panics or unwinds on a bad response.

mod http;
mod response;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::models::{Record, RecordId};

pub use http::HttpRemote;

/// CRUD access to the authoritative store.
///
/// `resource` is the remote name, already resolved through the
/// [`TableRegistry`](crate::TableRegistry).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All records of a resource.
    async fn list(&self, resource: &str) -> SyncResult<Vec<Record>>;

    /// One record by id.
    async fn get(&self, resource: &str, id: &RecordId) -> SyncResult<Record>;

    /// Create a record; returns the stored version with its remote id.
    async fn create(&self, resource: &str, record: &Record) -> SyncResult<Record>;

    /// Replace the record with `id`; returns the stored version.
    async fn update(&self, resource: &str, id: &RecordId, record: &Record) -> SyncResult<Record>;

    /// Delete the record with `id`.
    async fn delete(&self, resource: &str, id: &RecordId) -> SyncResult<()>;

    /// Cheap liveness probe.
    async fn health(&self) -> bool;
}
