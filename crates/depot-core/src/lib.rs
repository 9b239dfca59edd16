//! depot-core - Core library for Depot
//!
//! An offline-tolerant sync layer for record collections: writes go to the
//! remote store first and fall back to a local `SQLite` cache, with failed
//! writes replayed from a retry queue once the remote is reachable again.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod health;
pub mod locks;
pub mod models;
pub mod queue;
pub mod registry;
pub mod remote;
pub mod scheduler;
pub mod util;

#[cfg(test)]
mod testing;

pub use cache::{CacheStore, PendingRecord};
pub use config::{CacheRetention, SyncSettings};
pub use coordinator::{AutoSyncReport, DrainStep, SyncCoordinator};
pub use error::{Error, Result, SyncError, SyncResult};
pub use health::HealthStatus;
pub use models::{
    DeleteOutcome, FetchOutcome, FlushReport, LoadOutcome, Record, RecordId, SaveOutcome,
    SyncEvent, SyncOperation, SyncTask,
};
pub use registry::TableRegistry;
pub use remote::{HttpRemote, RemoteStore};
