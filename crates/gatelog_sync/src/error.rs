//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while mirroring to the remote store.
///
/// Everything here ends up in the sync queue rather than in front of the
/// user; the distinction between variants matters only for logging. In
/// particular, auth/policy rejections are retried exactly like network
/// failures up to the retry cap.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote credential or row policy rejected the call.
    #[error("remote auth rejected: {0}")]
    Auth(String),

    /// The remote server answered with a non-success status.
    #[error("remote error: status {status}: {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The per-request timeout elapsed.
    #[error("remote call timed out")]
    Timeout,

    /// Payload (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted queue blob could not be read or written.
    #[error("queue storage error: {0}")]
    QueueStorage(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::Remote {
            status: 403,
            message: "row-level security".into(),
        };
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("row-level security"));

        assert_eq!(SyncError::Timeout.to_string(), "remote call timed out");
    }
}
