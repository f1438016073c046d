//! # Gatelog Core
//!
//! Authoritative local store for gate security log records.
//!
//! This crate provides:
//! - The [`LogRecord`] data model (one vehicle/visitor entry-exit event)
//! - The [`LocalStore`] trait: one operation contract, two backends
//! - [`SqliteStore`]: the persistent desktop backend (SQLite file)
//! - [`MemoryStore`]: the in-memory backend, optionally persisted to a
//!   JSON snapshot file (the browser-storage analogue)
//! - Settings persistence (key to JSON value)
//!
//! ## Key invariants
//!
//! - `created_at` is immutable once assigned and serves as the natural
//!   join key with the remote mirror; the local `id` never leaves the
//!   device.
//! - Every mutating call persists durably before returning; callers get
//!   read-after-write consistency.
//! - Backend selection happens once at startup; callers never branch on
//!   the variant.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod record;
mod sqlite;
mod store;
mod time;

pub use error::{CoreError, CoreResult};
pub use memory::MemoryStore;
pub use record::{LogKind, LogPatch, LogRecord, NewLog, Stats};
pub use sqlite::SqliteStore;
pub use store::LocalStore;
pub use time::{date_of, now_iso, today};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default row cap for unbounded listing queries.
pub const DEFAULT_LIST_LIMIT: usize = 1000;

/// Default row cap for search queries.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;
