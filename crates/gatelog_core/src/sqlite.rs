//! Persistent SQLite backend (desktop variant).

use crate::error::{CoreError, CoreResult};
use crate::record::{LogKind, LogPatch, LogRecord, NewLog, Stats};
use crate::store::LocalStore;
use crate::time::today;
use fs2::FileExt;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tracing::{debug, info};

/// Database file name inside the data directory.
const DB_FILE: &str = "gatelog.db";
/// Advisory lock file enforcing the single-owner rule.
const LOCK_FILE: &str = "LOCK";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS security_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    sub_category TEXT,
    shift TEXT,
    plate TEXT,
    driver TEXT,
    name TEXT,
    host TEXT,
    note TEXT,
    location TEXT,
    seal_number TEXT,
    seal_number_entry TEXT,
    seal_number_exit TEXT,
    tc_no TEXT,
    phone TEXT,
    user_email TEXT,
    created_at TEXT NOT NULL,
    exit_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_plate ON security_logs(plate);
CREATE INDEX IF NOT EXISTS idx_name ON security_logs(name);
CREATE INDEX IF NOT EXISTS idx_created_at ON security_logs(created_at);
CREATE INDEX IF NOT EXISTS idx_exit_at ON security_logs(exit_at);
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT
);
";

const SELECT_COLUMNS: &str = "id, kind, sub_category, shift, plate, driver, name, host, note, \
     location, seal_number, seal_number_entry, seal_number_exit, tc_no, phone, user_email, \
     created_at, exit_at";

/// SQLite-backed [`LocalStore`].
///
/// Holds an exclusive advisory lock on the data directory for its whole
/// lifetime: exactly one process instance owns the local store at a time.
/// All statements are parameterized; user input never reaches the SQL
/// text.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    _lock: Option<File>,
}

impl SqliteStore {
    /// Opens (creating if needed) the store under `data_dir`.
    pub fn open(data_dir: &Path) -> CoreResult<Self> {
        fs::create_dir_all(data_dir)?;

        let lock_path = data_dir.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| CoreError::StoreLocked {
                path: data_dir.display().to_string(),
            })?;

        let db_path = data_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %db_path.display(), "sqlite store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            _lock: Some(lock),
        })
    }

    /// Opens a private in-memory database (tests, ephemeral sessions).
    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            _lock: None,
        })
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<LogRecord> {
        let kind_str: String = row.get("kind")?;
        let kind = LogKind::parse(&kind_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown log kind: {kind_str}").into(),
            )
        })?;

        Ok(LogRecord {
            id: row.get("id")?,
            kind,
            sub_category: row.get("sub_category")?,
            shift: row.get("shift")?,
            plate: row.get("plate")?,
            driver: row.get("driver")?,
            name: row.get("name")?,
            host: row.get("host")?,
            note: row.get("note")?,
            location: row.get("location")?,
            seal_number: row.get("seal_number")?,
            seal_number_entry: row.get("seal_number_entry")?,
            seal_number_exit: row.get("seal_number_exit")?,
            tc_no: row.get("tc_no")?,
            phone: row.get("phone")?,
            user_email: row.get("user_email")?,
            created_at: row.get("created_at")?,
            exit_at: row.get("exit_at")?,
        })
    }

    fn collect_rows(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> CoreResult<Vec<LogRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::map_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn count(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> CoreResult<usize> {
        let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl LocalStore for SqliteStore {
    fn active_logs(&self) -> CoreResult<Vec<LogRecord>> {
        let conn = self.conn.lock();
        Self::collect_rows(
            &conn,
            &format!(
                "SELECT {SELECT_COLUMNS} FROM security_logs \
                 WHERE exit_at IS NULL ORDER BY created_at DESC"
            ),
            &[],
        )
    }

    fn all_logs(&self, limit: usize) -> CoreResult<Vec<LogRecord>> {
        let conn = self.conn.lock();
        Self::collect_rows(
            &conn,
            &format!(
                "SELECT {SELECT_COLUMNS} FROM security_logs \
                 ORDER BY created_at DESC LIMIT ?1"
            ),
            &[&(limit as i64)],
        )
    }

    fn logs_by_date_range(&self, from: &str, to: &str) -> CoreResult<Vec<LogRecord>> {
        let conn = self.conn.lock();
        Self::collect_rows(
            &conn,
            &format!(
                "SELECT {SELECT_COLUMNS} FROM security_logs \
                 WHERE date(created_at) >= date(?1) AND date(created_at) <= date(?2) \
                 ORDER BY created_at DESC"
            ),
            &[&from, &to],
        )
    }

    fn get_log(&self, id: i64) -> CoreResult<Option<LogRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM security_logs WHERE id = ?1"),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(record)
    }

    fn insert_log(&self, new: NewLog) -> CoreResult<LogRecord> {
        let record = new.into_record(0);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO security_logs (
                kind, sub_category, shift, plate, driver, name, host, note, location,
                seal_number, seal_number_entry, seal_number_exit, tc_no, phone,
                user_email, created_at, exit_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                record.kind.as_str(),
                record.sub_category,
                record.shift,
                record.plate,
                record.driver,
                record.name,
                record.host,
                record.note,
                record.location,
                record.seal_number,
                record.seal_number_entry,
                record.seal_number_exit,
                record.tc_no,
                record.phone,
                record.user_email,
                record.created_at,
                record.exit_at,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, created_at = %record.created_at, "log inserted");
        Ok(LogRecord { id, ..record })
    }

    fn update_log(&self, id: i64, patch: &LogPatch) -> CoreResult<bool> {
        let pairs = patch.set_pairs();
        if pairs.is_empty() {
            return Ok(false);
        }

        let set_clause = pairs
            .iter()
            .map(|(col, _)| format!("{col} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values: Vec<&dyn rusqlite::ToSql> =
            pairs.iter().map(|(_, v)| v as &dyn rusqlite::ToSql).collect();
        values.push(&id);

        let conn = self.conn.lock();
        let changed = conn.execute(
            &format!("UPDATE security_logs SET {set_clause} WHERE id = ?"),
            values.as_slice(),
        )?;
        Ok(changed > 0)
    }

    fn delete_log(&self, id: i64) -> CoreResult<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM security_logs WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn search_logs(&self, term: &str, limit: usize) -> CoreResult<Vec<LogRecord>> {
        let pattern = format!("%{term}%");
        let conn = self.conn.lock();
        Self::collect_rows(
            &conn,
            &format!(
                "SELECT {SELECT_COLUMNS} FROM security_logs \
                 WHERE plate LIKE ?1 OR name LIKE ?1 OR host LIKE ?1 OR driver LIKE ?1 \
                 ORDER BY created_at DESC LIMIT ?2"
            ),
            &[&pattern, &(limit as i64)],
        )
    }

    fn stats(&self) -> CoreResult<Stats> {
        let day = today();
        let conn = self.conn.lock();
        Ok(Stats {
            today: Self::count(
                &conn,
                "SELECT COUNT(*) FROM security_logs WHERE date(created_at) = date(?1)",
                &[&day],
            )?,
            active_now: Self::count(
                &conn,
                "SELECT COUNT(*) FROM security_logs WHERE exit_at IS NULL",
                &[],
            )?,
            today_vehicle: Self::count(
                &conn,
                "SELECT COUNT(*) FROM security_logs \
                 WHERE date(created_at) = date(?1) AND kind = 'vehicle'",
                &[&day],
            )?,
            today_visitor: Self::count(
                &conn,
                "SELECT COUNT(*) FROM security_logs \
                 WHERE date(created_at) = date(?1) AND kind = 'visitor'",
                &[&day],
            )?,
        })
    }

    fn set_setting(&self, key: &str, value: &Value) -> CoreResult<()> {
        let serialized = serde_json::to_string(value)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, serialized],
        )?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> CoreResult<Option<Value>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        // Malformed stored JSON is treated as "no value".
        Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogKind;
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn vehicle(plate: &str, created_at: &str) -> NewLog {
        NewLog {
            plate: Some(plate.into()),
            created_at: Some(created_at.into()),
            ..NewLog::of_kind(LogKind::Vehicle)
        }
    }

    #[test]
    fn insert_roundtrip() {
        let store = store();
        let stored = store
            .insert_log(vehicle("34 ABC 123", "2024-01-01T08:00:00.000Z"))
            .unwrap();
        assert!(stored.id > 0);

        let all = store.all_logs(10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], stored);
    }

    #[test]
    fn active_set_and_exit() {
        let store = store();
        let a = store
            .insert_log(vehicle("34 A 1", "2024-01-01T08:00:00.000Z"))
            .unwrap();
        let b = store
            .insert_log(vehicle("34 B 2", "2024-01-01T09:00:00.000Z"))
            .unwrap();

        assert_eq!(store.active_logs().unwrap().len(), 2);

        assert!(store.exit_log(a.id, &LogPatch::default()).unwrap());
        let active = store.active_logs().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);

        let exited = store.get_log(a.id).unwrap().unwrap();
        assert!(exited.exit_at.is_some());
    }

    #[test]
    fn ordering_is_created_at_descending() {
        let store = store();
        store
            .insert_log(vehicle("OLD", "2024-01-01T08:00:00.000Z"))
            .unwrap();
        store
            .insert_log(vehicle("NEW", "2024-01-02T08:00:00.000Z"))
            .unwrap();
        store
            .insert_log(vehicle("MID", "2024-01-01T12:00:00.000Z"))
            .unwrap();

        let plates: Vec<_> = store
            .all_logs(10)
            .unwrap()
            .into_iter()
            .map(|r| r.plate.unwrap())
            .collect();
        assert_eq!(plates, vec!["NEW", "MID", "OLD"]);
    }

    #[test]
    fn all_logs_respects_limit() {
        let store = store();
        for i in 0..5 {
            store
                .insert_log(vehicle(
                    &format!("P{i}"),
                    &format!("2024-01-0{}T08:00:00.000Z", i + 1),
                ))
                .unwrap();
        }
        assert_eq!(store.all_logs(3).unwrap().len(), 3);
    }

    #[test]
    fn date_range_day_boundaries() {
        let store = store();
        store
            .insert_log(vehicle("LAST-SECOND", "2024-01-02T23:59:59.000Z"))
            .unwrap();
        store
            .insert_log(vehicle("NEXT-DAY", "2024-01-03T00:00:00.000Z"))
            .unwrap();

        let hits = store
            .logs_by_date_range("2024-01-01", "2024-01-02")
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].plate.as_deref(), Some("LAST-SECOND"));
    }

    #[test]
    fn empty_patch_returns_false() {
        let store = store();
        let stored = store
            .insert_log(vehicle("34 ABC", "2024-01-01T08:00:00.000Z"))
            .unwrap();

        assert!(!store.update_log(stored.id, &LogPatch::default()).unwrap());
        assert_eq!(store.get_log(stored.id).unwrap().unwrap(), stored);
    }

    #[test]
    fn update_unknown_id_returns_false() {
        let store = store();
        let patch = LogPatch {
            note: Some("n".into()),
            ..LogPatch::default()
        };
        assert!(!store.update_log(999, &patch).unwrap());
    }

    #[test]
    fn delete_reports_removal() {
        let store = store();
        let stored = store
            .insert_log(vehicle("34 ABC", "2024-01-01T08:00:00.000Z"))
            .unwrap();
        assert!(store.delete_log(stored.id).unwrap());
        assert!(!store.delete_log(stored.id).unwrap());
        assert!(store.get_log(stored.id).unwrap().is_none());
    }

    #[test]
    fn search_is_case_insensitive() {
        let store = store();
        store
            .insert_log(NewLog {
                name: Some("Jane Carter".into()),
                created_at: Some("2024-01-01T08:00:00.000Z".into()),
                ..NewLog::of_kind(LogKind::Visitor)
            })
            .unwrap();

        assert_eq!(store.search_logs("jane", 10).unwrap().len(), 1);
        assert_eq!(store.search_logs("CART", 10).unwrap().len(), 1);
        assert!(store.search_logs("nobody", 10).unwrap().is_empty());
    }

    #[test]
    fn stats_counts_today_and_active() {
        let store = store();
        let now = crate::time::now_iso();
        store
            .insert_log(NewLog {
                created_at: Some(now.clone()),
                ..NewLog::of_kind(LogKind::Vehicle)
            })
            .unwrap();
        store
            .insert_log(NewLog {
                created_at: Some(now),
                ..NewLog::of_kind(LogKind::Visitor)
            })
            .unwrap();
        // A record from another day that already left.
        store
            .insert_log(NewLog {
                created_at: Some("2020-05-05T08:00:00.000Z".into()),
                exit_at: Some("2020-05-05T10:00:00.000Z".into()),
                ..NewLog::of_kind(LogKind::Vehicle)
            })
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.today, 2);
        assert_eq!(stats.active_now, 2);
        assert_eq!(stats.today_vehicle, 1);
        assert_eq!(stats.today_visitor, 1);
    }

    #[test]
    fn settings_roundtrip_and_malformed() {
        let store = store();
        store
            .set_setting("email", &json!({"enabled": true}))
            .unwrap();
        assert_eq!(
            store.get_setting("email").unwrap(),
            Some(json!({"enabled": true}))
        );
        assert_eq!(store.get_setting("missing").unwrap(), None);

        // Malformed stored JSON reads as absent.
        {
            let conn = store.conn.lock();
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES ('bad', '{not json')",
                [],
            )
            .unwrap();
        }
        assert_eq!(store.get_setting("bad").unwrap(), None);
    }

    #[test]
    fn unknown_stored_kind_maps_to_sqlite_error() {
        let store = store();
        let id = store
            .insert_log(vehicle("34 X 9", "2024-01-01T08:00:00.000Z"))
            .unwrap()
            .id;
        {
            let conn = store.conn.lock();
            conn.execute("UPDATE security_logs SET kind = 'ghost' WHERE id = ?1", [id])
                .unwrap();
        }
        assert!(matches!(store.get_log(id), Err(CoreError::Sqlite(_))));
    }

    #[test]
    fn directory_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let first = SqliteStore::open(dir.path()).unwrap();
        let second = SqliteStore::open(dir.path());
        assert!(matches!(second, Err(CoreError::StoreLocked { .. })));
        drop(first);
    }
}
