//! In-memory backend with optional JSON snapshot persistence.
//!
//! This is the browser-storage analogue of the desktop SQLite variant:
//! the whole record set lives in memory and, when file-backed, is
//! rewritten to a snapshot file after every mutation (the equivalent of
//! a `localStorage.setItem` on each write).

use crate::error::CoreResult;
use crate::record::{LogPatch, LogRecord, NewLog, Stats};
use crate::store::LocalStore;
use crate::time::{date_of, today};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    logs: Vec<LogRecord>,
    settings: BTreeMap<String, Value>,
    next_id: i64,
}

/// Memory-backed [`LocalStore`].
pub struct MemoryStore {
    state: RwLock<Snapshot>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Creates a volatile store (nothing outlives the process).
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Snapshot {
                next_id: 1,
                ..Snapshot::default()
            }),
            path: None,
        }
    }

    /// Opens a file-backed store, loading the existing snapshot.
    ///
    /// A corrupt snapshot resets to an empty store with a warning; the
    /// store is authoritative from that point on.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let snapshot = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Snapshot>(&raw) {
                Ok(mut s) => {
                    let max_id = s.logs.iter().map(|l| l.id).max().unwrap_or(0);
                    s.next_id = s.next_id.max(max_id + 1);
                    s
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt snapshot, starting empty");
                    Snapshot {
                        next_id: 1,
                        ..Snapshot::default()
                    }
                }
            },
            Err(_) => Snapshot {
                next_id: 1,
                ..Snapshot::default()
            },
        };

        Ok(Self {
            state: RwLock::new(snapshot),
            path: Some(path.to_path_buf()),
        })
    }

    /// Rewrites the snapshot file atomically (write temp, then rename).
    fn persist(&self, state: &Snapshot) -> CoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(state)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn sorted_desc(mut logs: Vec<LogRecord>) -> Vec<LogRecord> {
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore for MemoryStore {
    fn active_logs(&self) -> CoreResult<Vec<LogRecord>> {
        let state = self.state.read();
        Ok(Self::sorted_desc(
            state
                .logs
                .iter()
                .filter(|l| l.exit_at.is_none())
                .cloned()
                .collect(),
        ))
    }

    fn all_logs(&self, limit: usize) -> CoreResult<Vec<LogRecord>> {
        let state = self.state.read();
        let mut logs = Self::sorted_desc(state.logs.clone());
        logs.truncate(limit);
        Ok(logs)
    }

    fn logs_by_date_range(&self, from: &str, to: &str) -> CoreResult<Vec<LogRecord>> {
        let state = self.state.read();
        Ok(Self::sorted_desc(
            state
                .logs
                .iter()
                .filter(|l| {
                    let day = date_of(&l.created_at);
                    day >= from && day <= to
                })
                .cloned()
                .collect(),
        ))
    }

    fn get_log(&self, id: i64) -> CoreResult<Option<LogRecord>> {
        let state = self.state.read();
        Ok(state.logs.iter().find(|l| l.id == id).cloned())
    }

    fn insert_log(&self, new: NewLog) -> CoreResult<LogRecord> {
        let mut state = self.state.write();
        let id = state.next_id;
        state.next_id += 1;
        let record = new.into_record(id);
        state.logs.push(record.clone());
        self.persist(&state)?;
        Ok(record)
    }

    fn update_log(&self, id: i64, patch: &LogPatch) -> CoreResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }
        let mut state = self.state.write();
        let Some(record) = state.logs.iter_mut().find(|l| l.id == id) else {
            return Ok(false);
        };
        patch.apply_to(record);
        self.persist(&state)?;
        Ok(true)
    }

    fn delete_log(&self, id: i64) -> CoreResult<bool> {
        let mut state = self.state.write();
        let before = state.logs.len();
        state.logs.retain(|l| l.id != id);
        let removed = state.logs.len() != before;
        if removed {
            self.persist(&state)?;
        }
        Ok(removed)
    }

    fn search_logs(&self, term: &str, limit: usize) -> CoreResult<Vec<LogRecord>> {
        let needle = term.to_lowercase();
        let matches = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        };

        let state = self.state.read();
        let mut hits = Self::sorted_desc(
            state
                .logs
                .iter()
                .filter(|l| {
                    matches(&l.plate) || matches(&l.name) || matches(&l.host) || matches(&l.driver)
                })
                .cloned()
                .collect(),
        );
        hits.truncate(limit);
        Ok(hits)
    }

    fn stats(&self) -> CoreResult<Stats> {
        let day = today();
        let state = self.state.read();
        let today_logs: Vec<_> = state
            .logs
            .iter()
            .filter(|l| date_of(&l.created_at) == day)
            .collect();

        Ok(Stats {
            today: today_logs.len(),
            active_now: state.logs.iter().filter(|l| l.exit_at.is_none()).count(),
            today_vehicle: today_logs
                .iter()
                .filter(|l| l.kind == crate::record::LogKind::Vehicle)
                .count(),
            today_visitor: today_logs
                .iter()
                .filter(|l| l.kind == crate::record::LogKind::Visitor)
                .count(),
        })
    }

    fn set_setting(&self, key: &str, value: &Value) -> CoreResult<()> {
        let mut state = self.state.write();
        state.settings.insert(key.to_string(), value.clone());
        self.persist(&state)?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> CoreResult<Option<Value>> {
        let state = self.state.read();
        Ok(state.settings.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogKind;
    use serde_json::json;

    fn visitor(name: &str, created_at: &str) -> NewLog {
        NewLog {
            name: Some(name.into()),
            created_at: Some(created_at.into()),
            ..NewLog::of_kind(LogKind::Visitor)
        }
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store
            .insert_log(visitor("A", "2024-01-01T08:00:00.000Z"))
            .unwrap();
        let b = store
            .insert_log(visitor("B", "2024-01-01T09:00:00.000Z"))
            .unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn active_and_exit_mirror_sqlite_semantics() {
        let store = MemoryStore::new();
        let a = store
            .insert_log(visitor("A", "2024-01-01T08:00:00.000Z"))
            .unwrap();
        store
            .insert_log(visitor("B", "2024-01-01T09:00:00.000Z"))
            .unwrap();

        assert!(store.exit_log(a.id, &LogPatch::default()).unwrap());
        let active = store.active_logs().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name.as_deref(), Some("B"));
    }

    #[test]
    fn ordering_descending() {
        let store = MemoryStore::new();
        store
            .insert_log(visitor("OLD", "2024-01-01T08:00:00.000Z"))
            .unwrap();
        store
            .insert_log(visitor("NEW", "2024-01-03T08:00:00.000Z"))
            .unwrap();
        store
            .insert_log(visitor("MID", "2024-01-02T08:00:00.000Z"))
            .unwrap();

        let names: Vec<_> = store
            .all_logs(10)
            .unwrap()
            .into_iter()
            .map(|r| r.name.unwrap())
            .collect();
        assert_eq!(names, vec!["NEW", "MID", "OLD"]);
    }

    #[test]
    fn date_range_boundaries() {
        let store = MemoryStore::new();
        store
            .insert_log(visitor("IN", "2024-01-02T23:59:59.000Z"))
            .unwrap();
        store
            .insert_log(visitor("OUT", "2024-01-03T00:00:00.000Z"))
            .unwrap();

        let hits = store
            .logs_by_date_range("2024-01-01", "2024-01-02")
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name.as_deref(), Some("IN"));
    }

    #[test]
    fn empty_patch_and_unknown_id() {
        let store = MemoryStore::new();
        let stored = store
            .insert_log(visitor("A", "2024-01-01T08:00:00.000Z"))
            .unwrap();

        assert!(!store.update_log(stored.id, &LogPatch::default()).unwrap());
        let patch = LogPatch {
            note: Some("n".into()),
            ..LogPatch::default()
        };
        assert!(!store.update_log(404, &patch).unwrap());
        assert_eq!(store.get_log(stored.id).unwrap().unwrap(), stored);
    }

    #[test]
    fn search_case_insensitive_with_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_log(visitor(
                    &format!("Pat Doe {i}"),
                    &format!("2024-01-0{}T08:00:00.000Z", i + 1),
                ))
                .unwrap();
        }
        assert_eq!(store.search_logs("pat doe", 3).unwrap().len(), 3);
        assert!(store.search_logs("absent", 10).unwrap().is_empty());
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.json");

        {
            let store = MemoryStore::open(&path).unwrap();
            store
                .insert_log(visitor("Kept", "2024-01-01T08:00:00.000Z"))
                .unwrap();
            store.set_setting("k", &json!(1)).unwrap();
        }

        let store = MemoryStore::open(&path).unwrap();
        let all = store.all_logs(10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name.as_deref(), Some("Kept"));
        assert_eq!(store.get_setting("k").unwrap(), Some(json!(1)));

        // Ids keep advancing after a reload.
        let next = store
            .insert_log(visitor("New", "2024-01-02T08:00:00.000Z"))
            .unwrap();
        assert!(next.id > all[0].id);
    }

    #[test]
    fn stats_tolerate_malformed_timestamps() {
        let store = MemoryStore::new();
        store.insert_log(visitor("Odd", "123456789éxx")).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.today, 0);
        assert_eq!(stats.active_now, 1);
    }

    #[test]
    fn corrupt_snapshot_resets_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.json");
        fs::write(&path, "{definitely not json").unwrap();

        let store = MemoryStore::open(&path).unwrap();
        assert!(store.all_logs(10).unwrap().is_empty());
    }
}
