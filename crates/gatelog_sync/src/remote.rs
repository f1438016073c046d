//! The remote table boundary.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};

/// One row-matching condition.
///
/// Conditions are data, never interpolated strings; the transport decides
/// how to render them (query parameters for HTTP, predicates for the
/// test double).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Column equals a string value.
    Eq(&'static str, String),
    /// Column is SQL NULL.
    IsNull(&'static str),
}

/// A conjunction of [`Condition`]s selecting remote rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// The conditions, all of which must hold.
    pub conditions: Vec<Condition>,
}

impl Filter {
    /// Creates an empty filter (matches every row).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Eq(column, value.into()));
        self
    }

    /// Adds an IS NULL condition.
    #[must_use]
    pub fn is_null(mut self, column: &'static str) -> Self {
        self.conditions.push(Condition::IsNull(column));
        self
    }

    /// Tests a JSON row against every condition.
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|c| match c {
            Condition::Eq(column, value) => {
                row.get(column).and_then(Value::as_str) == Some(value.as_str())
            }
            Condition::IsNull(column) => {
                row.get(column).map_or(true, Value::is_null)
            }
        })
    }
}

/// Client for the single logical `security_logs` table on the remote
/// store.
///
/// Authentication is a pre-configured service credential owned by the
/// implementation. Any failure (network, auth, policy) is returned as a
/// [`SyncError`]; the caller routes it into the sync queue.
pub trait RemoteTable: Send + Sync {
    /// Inserts one row.
    fn insert(&self, row: &Value) -> SyncResult<()>;

    /// Applies `patch` to every row matching `filter`.
    fn update(&self, filter: &Filter, patch: &Value) -> SyncResult<()>;

    /// Deletes every row matching `filter`.
    fn delete(&self, filter: &Filter) -> SyncResult<()>;
}

/// In-memory [`RemoteTable`] double for tests.
///
/// Keeps real row state so assertions can check what the mirror would
/// contain, and injects failures on demand.
#[derive(Debug, Default)]
pub struct MockRemoteTable {
    rows: Mutex<Vec<Value>>,
    fail_remaining: AtomicU32,
    calls: AtomicU32,
}

impl MockRemoteTable {
    /// Creates an empty, healthy mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls fail with a transport error.
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Total calls received, failed ones included.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the mirrored rows.
    pub fn rows(&self) -> Vec<Value> {
        self.rows.lock().clone()
    }

    fn check_failure(&self) -> SyncResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::Transport("injected failure".into()));
        }
        Ok(())
    }
}

impl RemoteTable for MockRemoteTable {
    fn insert(&self, row: &Value) -> SyncResult<()> {
        self.check_failure()?;
        self.rows.lock().push(row.clone());
        Ok(())
    }

    fn update(&self, filter: &Filter, patch: &Value) -> SyncResult<()> {
        self.check_failure()?;
        let mut rows = self.rows.lock();
        for row in rows.iter_mut().filter(|r| filter.matches(r)) {
            if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                for (k, v) in fields {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    fn delete(&self, filter: &Filter) -> SyncResult<()> {
        self.check_failure()?;
        self.rows.lock().retain(|r| !filter.matches(r));
        Ok(())
    }
}
