//! Data models for Depot

mod outcome;
mod record;
mod task;

pub use outcome::{
    DeleteOutcome, FetchOutcome, FlushReport, LoadOutcome, SaveOutcome, SyncEvent,
};
pub use record::{position_of, Record, RecordId, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
pub use task::{SyncOperation, SyncTask};
