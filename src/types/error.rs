//! Error types for the process memory library.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur in the process memory library.
///
/// Lookups that find nothing are not errors: `get` returns `None` and graph
/// traversal represents missing targets as [`Resolved::Dangling`](super::Resolved).
#[derive(Error, Debug)]
pub enum PmemError {
    /// An entry failed append-time validation. The log is unaffected.
    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    /// The underlying medium could not be written or read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The log file exists but cannot be read at all.
    #[error("Store unavailable at {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An operation that needs an existing entry found none.
    #[error("Entry {0:?} not found")]
    EntryNotFound(String),

    /// JSON encoding or decoding failed outside of a log scan.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience result type for process memory operations.
pub type PmemResult<T> = Result<T, PmemError>;
