//! CLI command implementations.

pub mod add;
pub mod delete;
pub mod exit;
pub mod list;
pub mod queue;
pub mod report;
pub mod setting;
pub mod stats;

use gatelog_core::SqliteStore;
use gatelog_dispatch::Dispatcher;
use gatelog_sync::{FileQueueBackend, Filter, RemoteTable, SyncConfig, SyncError, SyncResult};
use serde_json::Value;
use std::path::Path;

/// Shared command result type.
pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Remote stand-in for this offline tool.
///
/// The dispatcher's worker is never started here, so mutations enqueue
/// their sync operations directly into the persisted queue; the desktop
/// application delivers them on its next run. Nothing ever calls this
/// type, it only satisfies the dispatcher's remote slot.
pub struct OfflineRemote;

impl RemoteTable for OfflineRemote {
    fn insert(&self, _row: &Value) -> SyncResult<()> {
        Err(SyncError::Transport("offline administration tool".into()))
    }

    fn update(&self, _filter: &Filter, _patch: &Value) -> SyncResult<()> {
        Err(SyncError::Transport("offline administration tool".into()))
    }

    fn delete(&self, _filter: &Filter) -> SyncResult<()> {
        Err(SyncError::Transport("offline administration tool".into()))
    }
}

/// The dispatcher type every command operates on.
pub type CliDispatcher = Dispatcher<SqliteStore, OfflineRemote>;

/// Opens the store and queue under `data_dir`.
pub fn open(data_dir: &Path) -> Result<CliDispatcher, Box<dyn std::error::Error>> {
    let store = SqliteStore::open(data_dir)?;
    let backend = FileQueueBackend::new(data_dir);
    Ok(Dispatcher::new(
        store,
        OfflineRemote,
        Box::new(backend),
        SyncConfig::default(),
    ))
}
