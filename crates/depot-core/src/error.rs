//! Error types for depot-core

use thiserror::Error;

/// Result type alias using depot-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depot-core operations outside of remote sync.
#[derive(Error, Debug)]
pub enum Error {
    /// `SQLite` error from the cache store
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for remote operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Typed outcome of a failed remote call.
///
/// This is a closed set: every transport failure, bad status, or unexpected
/// payload is classified into one of these before leaving the remote client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Connection failure, DNS failure, or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The remote answered, but the payload is not a record or record list.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Update, get, or delete against an id the remote does not know.
    #[error("{resource}/{id} not found")]
    NotFound { resource: String, id: String },
}

impl SyncError {
    /// Returns true if replaying the same request later could succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::MalformedResponse(_) => true,
            Self::Server { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::NotFound { .. } => false,
        }
    }

    /// Short kind label used in logs and CLI output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Server { .. } => "server",
            Self::MalformedResponse(_) => "malformed",
            Self::NotFound { .. } => "not_found",
        }
    }
}
