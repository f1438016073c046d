//! Error types for the local store.

use std::io;
use thiserror::Error;

/// Result type for local store operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in local store operations.
///
/// Local I/O failures are fatal to the calling operation and propagate
/// unmodified to the UI layer; remote-sync failures never appear here.
#[derive(Debug, Error)]
pub enum CoreError {
    /// SQLite backend error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error from the file-backed store or snapshot writes.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another process holds the data directory lock.
    #[error("store locked: another process owns {path}")]
    StoreLocked {
        /// The data directory that is locked.
        path: String,
    },
}
