use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] depot_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Collection name cannot be empty")]
    EmptyCollection,
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Record data must be a JSON object, e.g. '{{\"name\": \"Acme\"}}'")]
    InvalidRecord,
    #[error("Record not found: {0}")]
    RecordNotFound(String),
    #[error("Write could not be stored remotely or locally")]
    NotPreserved,
    #[error("Remote API is unreachable at {0}")]
    RemoteUnavailable(String),
}
