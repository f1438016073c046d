//! The security log data model.

use crate::time::now_iso;
use serde::{Deserialize, Serialize};

/// What kind of entry a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// A vehicle passing the gate.
    Vehicle,
    /// A visitor on foot.
    Visitor,
}

impl LogKind {
    /// Returns the storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Vehicle => "vehicle",
            LogKind::Visitor => "visitor",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vehicle" => Some(LogKind::Vehicle),
            "visitor" => Some(LogKind::Visitor),
            _ => None,
        }
    }
}

/// One entry/exit event at the gate.
///
/// `id` is a local surrogate key and never leaves the device. `created_at`
/// is assigned at insert time, is immutable afterwards, and uniquely
/// correlates the record with its remote mirror row. `exit_at` stays
/// `None` while the vehicle/visitor is still on site; once set it is
/// merged into the same row, never a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Local surrogate key.
    pub id: i64,
    /// Vehicle or visitor.
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// Free-form category within the kind (supplier, staff, guest, ...).
    pub sub_category: Option<String>,
    /// Shift the entry was recorded on.
    pub shift: Option<String>,
    /// License plate (vehicles).
    pub plate: Option<String>,
    /// Driver name (vehicles).
    pub driver: Option<String>,
    /// Visitor name.
    pub name: Option<String>,
    /// Person or department being visited.
    pub host: Option<String>,
    /// Free-form note.
    pub note: Option<String>,
    /// Gate or site location.
    pub location: Option<String>,
    /// Seal number on the load.
    pub seal_number: Option<String>,
    /// Seal number recorded at entry.
    pub seal_number_entry: Option<String>,
    /// Seal number recorded at exit.
    pub seal_number_exit: Option<String>,
    /// National identity number.
    pub tc_no: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Account of the front-desk user who recorded the entry.
    pub user_email: Option<String>,
    /// Entry timestamp, RFC 3339 UTC. The natural join key with the mirror.
    pub created_at: String,
    /// Exit timestamp; `None` while still on site.
    pub exit_at: Option<String>,
}

/// Payload for inserting a new record.
///
/// `created_at` may be supplied (e.g. when backfilling) or left `None`
/// to be stamped with "now" by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLog {
    /// Vehicle or visitor.
    #[serde(rename = "type")]
    pub kind: Option<LogKind>,
    /// See [`LogRecord::sub_category`].
    pub sub_category: Option<String>,
    /// See [`LogRecord::shift`].
    pub shift: Option<String>,
    /// See [`LogRecord::plate`].
    pub plate: Option<String>,
    /// See [`LogRecord::driver`].
    pub driver: Option<String>,
    /// See [`LogRecord::name`].
    pub name: Option<String>,
    /// See [`LogRecord::host`].
    pub host: Option<String>,
    /// See [`LogRecord::note`].
    pub note: Option<String>,
    /// See [`LogRecord::location`].
    pub location: Option<String>,
    /// See [`LogRecord::seal_number`].
    pub seal_number: Option<String>,
    /// See [`LogRecord::seal_number_entry`].
    pub seal_number_entry: Option<String>,
    /// See [`LogRecord::seal_number_exit`].
    pub seal_number_exit: Option<String>,
    /// See [`LogRecord::tc_no`].
    pub tc_no: Option<String>,
    /// See [`LogRecord::phone`].
    pub phone: Option<String>,
    /// See [`LogRecord::user_email`].
    pub user_email: Option<String>,
    /// Entry timestamp; stamped with "now" when absent.
    pub created_at: Option<String>,
    /// Exit timestamp, for backfilled records that already left.
    pub exit_at: Option<String>,
}

impl NewLog {
    /// Creates an empty payload of the given kind.
    pub fn of_kind(kind: LogKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Materializes the payload into a stored record.
    ///
    /// Assigns `created_at` when the caller did not supply one. The `id`
    /// comes from the backend.
    pub fn into_record(self, id: i64) -> LogRecord {
        LogRecord {
            id,
            kind: self.kind.unwrap_or(LogKind::Visitor),
            sub_category: self.sub_category,
            shift: self.shift,
            plate: self.plate,
            driver: self.driver,
            name: self.name,
            host: self.host,
            note: self.note,
            location: self.location,
            seal_number: self.seal_number,
            seal_number_entry: self.seal_number_entry,
            seal_number_exit: self.seal_number_exit,
            tc_no: self.tc_no,
            phone: self.phone,
            user_email: self.user_email,
            created_at: self.created_at.unwrap_or_else(now_iso),
            exit_at: self.exit_at,
        }
    }
}

/// Partial update for an existing record.
///
/// Only set fields are applied; `None` means "leave unchanged". The
/// serialized form skips unset fields so a remote patch carries exactly
/// the fields that changed. `created_at` is deliberately absent: it is
/// immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogPatch {
    /// See [`LogRecord::sub_category`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    /// See [`LogRecord::shift`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
    /// See [`LogRecord::plate`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    /// See [`LogRecord::driver`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// See [`LogRecord::name`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// See [`LogRecord::host`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// See [`LogRecord::note`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// See [`LogRecord::location`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// See [`LogRecord::seal_number`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seal_number: Option<String>,
    /// See [`LogRecord::seal_number_entry`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seal_number_entry: Option<String>,
    /// See [`LogRecord::seal_number_exit`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seal_number_exit: Option<String>,
    /// See [`LogRecord::tc_no`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tc_no: Option<String>,
    /// See [`LogRecord::phone`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// See [`LogRecord::user_email`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    /// Exit timestamp; set by `exit_log`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_at: Option<String>,
}

/// Applies a closure to every (column name, set value) pair of a patch.
///
/// Shared between the SQL SET-clause builder and the in-memory merge so
/// the two backends cannot drift apart.
macro_rules! for_each_patch_field {
    ($patch:expr, $f:expr) => {{
        let patch = $patch;
        let mut f = $f;
        if let Some(v) = &patch.sub_category {
            f("sub_category", v);
        }
        if let Some(v) = &patch.shift {
            f("shift", v);
        }
        if let Some(v) = &patch.plate {
            f("plate", v);
        }
        if let Some(v) = &patch.driver {
            f("driver", v);
        }
        if let Some(v) = &patch.name {
            f("name", v);
        }
        if let Some(v) = &patch.host {
            f("host", v);
        }
        if let Some(v) = &patch.note {
            f("note", v);
        }
        if let Some(v) = &patch.location {
            f("location", v);
        }
        if let Some(v) = &patch.seal_number {
            f("seal_number", v);
        }
        if let Some(v) = &patch.seal_number_entry {
            f("seal_number_entry", v);
        }
        if let Some(v) = &patch.seal_number_exit {
            f("seal_number_exit", v);
        }
        if let Some(v) = &patch.tc_no {
            f("tc_no", v);
        }
        if let Some(v) = &patch.phone {
            f("phone", v);
        }
        if let Some(v) = &patch.user_email {
            f("user_email", v);
        }
        if let Some(v) = &patch.exit_at {
            f("exit_at", v);
        }
    }};
}

impl LogPatch {
    /// Returns true when no field is set.
    pub fn is_empty(&self) -> bool {
        let mut any = false;
        for_each_patch_field!(self, |_col: &'static str, _v: &String| any = true);
        !any
    }

    /// Collects (column, value) pairs of the set fields, in declaration
    /// order.
    pub fn set_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        for_each_patch_field!(self, |col: &'static str, v| {
            pairs.push((col, String::as_str(v)))
        });
        pairs
    }

    /// Merges the set fields into a record in place.
    pub fn apply_to(&self, record: &mut LogRecord) {
        macro_rules! merge {
            ($field:ident) => {
                if let Some(v) = &self.$field {
                    record.$field = Some(v.clone());
                }
            };
        }
        merge!(sub_category);
        merge!(shift);
        merge!(plate);
        merge!(driver);
        merge!(name);
        merge!(host);
        merge!(note);
        merge!(location);
        merge!(seal_number);
        merge!(seal_number_entry);
        merge!(seal_number_exit);
        merge!(tc_no);
        merge!(phone);
        merge!(user_email);
        merge!(exit_at);
    }
}

/// Counters shown on the front-desk dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Records created today (UTC calendar day).
    pub today: usize,
    /// Records with no exit yet, regardless of day.
    pub active_now: usize,
    /// Vehicle records created today.
    pub today_vehicle: usize,
    /// Visitor records created today.
    pub today_visitor: usize,
}
