//! Report crate errors.

use gatelog_core::CoreError;
use thiserror::Error;

/// Errors raised while building or sending a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Reading logs or settings from the local store failed.
    #[error("store error: {0}")]
    Store(#[from] CoreError),

    /// The recipient list is empty; there is nobody to send to.
    #[error("recipient list is empty")]
    NoRecipients,
}

/// Result alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;
