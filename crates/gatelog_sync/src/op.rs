//! Pending remote-mirror operations.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One local mutation awaiting delivery to the remote mirror.
///
/// The correlation key for everything but INSERT is the record's
/// `created_at` timestamp; the local surrogate `id` has no meaning
/// remotely and never appears in a remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum SyncOp {
    /// A new local row to mirror. Carries the full stored record; the
    /// local `id` is stripped at send time.
    Insert {
        /// The stored record as JSON.
        row: Value,
    },
    /// A field-level update to an existing mirrored row.
    Update {
        /// Correlation key of the target row.
        created_at: String,
        /// Only the fields that changed.
        patch: Value,
    },
    /// Removal of a mirrored row.
    Delete {
        /// Correlation key of the target row.
        created_at: String,
    },
    /// An exit stamped on the active row(s) matching by plate, or name
    /// when no plate is recorded. A heuristic match, not a unique-key
    /// lookup: every still-active row with the same plate/name is
    /// updated.
    Exit {
        /// Plate of the exiting vehicle, preferred match key.
        plate: Option<String>,
        /// Visitor name, fallback match key.
        name: Option<String>,
        /// Exit timestamp to stamp.
        exit_at: String,
        /// Additional exit fields (seal number at exit, note, ...).
        extra: Value,
    },
}

impl SyncOp {
    /// Short action name for logs.
    pub fn action(&self) -> &'static str {
        match self {
            SyncOp::Insert { .. } => "INSERT",
            SyncOp::Update { .. } => "UPDATE",
            SyncOp::Delete { .. } => "DELETE",
            SyncOp::Exit { .. } => "EXIT",
        }
    }

    /// The `created_at` correlation key, where the op carries one.
    pub fn correlation_key(&self) -> Option<&str> {
        match self {
            SyncOp::Insert { row } => row.get("created_at").and_then(Value::as_str),
            SyncOp::Update { created_at, .. } | SyncOp::Delete { created_at } => Some(created_at),
            SyncOp::Exit { .. } => None,
        }
    }
}

/// A queued [`SyncOp`] with its retry bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The pending operation.
    pub op: SyncOp,
    /// Enqueue time, Unix milliseconds.
    pub timestamp: i64,
    /// Failed drain attempts so far.
    pub retries: u32,
}

impl QueueEntry {
    /// Wraps an operation with a fresh retry counter.
    pub fn new(op: SyncOp) -> Self {
        Self {
            op,
            timestamp: Utc::now().timestamp_millis(),
            retries: 0,
        }
    }
}
