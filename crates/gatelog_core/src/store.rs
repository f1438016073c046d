//! The storage-variant-independent operation contract.

use crate::error::CoreResult;
use crate::record::{LogPatch, LogRecord, NewLog, Stats};
use crate::time::now_iso;
use serde_json::Value;

/// CRUD contract over the authoritative local record set.
///
/// Both backends ([`crate::SqliteStore`] for desktop,
/// [`crate::MemoryStore`] for browser-style storage) implement this trait
/// with identical semantics, so callers pick a backend once at startup
/// and never branch again.
///
/// Every mutating call persists durably before returning. Storage I/O
/// failure is fatal to the call and propagates; it is the only class of
/// error a caller ever sees from the local path.
pub trait LocalStore: Send + Sync {
    /// Records still on site (`exit_at` unset), newest first.
    fn active_logs(&self) -> CoreResult<Vec<LogRecord>>;

    /// All records, newest first, truncated to `limit`.
    fn all_logs(&self, limit: usize) -> CoreResult<Vec<LogRecord>>;

    /// Records whose `created_at` calendar day falls within
    /// `[from, to]` inclusive (both `YYYY-MM-DD`), newest first.
    fn logs_by_date_range(&self, from: &str, to: &str) -> CoreResult<Vec<LogRecord>>;

    /// Looks up a single record by local id.
    fn get_log(&self, id: i64) -> CoreResult<Option<LogRecord>>;

    /// Inserts a record, assigning `created_at` (when absent) and a local
    /// id, and returns the stored form.
    fn insert_log(&self, new: NewLog) -> CoreResult<LogRecord>;

    /// Merges the set fields of `patch` into the record matching `id`.
    ///
    /// Returns `Ok(false)` without touching storage when the patch is
    /// empty or no record matches.
    fn update_log(&self, id: i64, patch: &LogPatch) -> CoreResult<bool>;

    /// Marks a record as exited: `update_log` with `exit_at` set to now,
    /// merged over `extra`.
    fn exit_log(&self, id: i64, extra: &LogPatch) -> CoreResult<bool> {
        let mut patch = extra.clone();
        patch.exit_at = Some(now_iso());
        self.update_log(id, &patch)
    }

    /// Removes a record by id; reports whether a row was actually removed.
    fn delete_log(&self, id: i64) -> CoreResult<bool>;

    /// Case-insensitive substring search across plate, name, host and
    /// driver, newest first, at most `limit` rows.
    fn search_logs(&self, term: &str, limit: usize) -> CoreResult<Vec<LogRecord>>;

    /// Dashboard counters for the current UTC day.
    fn stats(&self) -> CoreResult<Stats>;

    /// Persists a JSON value under a settings key.
    fn set_setting(&self, key: &str, value: &Value) -> CoreResult<()>;

    /// Reads a settings value; malformed stored JSON reads as `None`.
    fn get_setting(&self, key: &str) -> CoreResult<Option<Value>>;
}
