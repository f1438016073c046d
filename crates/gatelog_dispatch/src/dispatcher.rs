//! The dual-write facade and its background sync worker.

use gatelog_core::{now_iso, CoreResult, LocalStore, LogPatch, LogRecord, NewLog, Stats};
use gatelog_sync::{
    DrainReport, MirrorClient, QueueBackend, RemoteTable, SyncConfig, SyncOp, SyncQueue,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};

enum Job {
    /// First delivery attempt for a fresh mutation.
    Mirror(SyncOp),
    Shutdown,
}

struct Worker {
    sender: Sender<Job>,
    handle: JoinHandle<()>,
}

/// Facade combining local store, sync queue and remote mirror.
///
/// All mutations follow the same shape: local write first, matching
/// [`SyncOp`] handed to the worker on success. The caller only ever sees
/// local storage errors; the remote side is absorbed by the queue.
///
/// Constructed once at startup and shared (`Arc`) wherever mutations
/// originate. [`start`](Self::start) spawns the worker, which runs one
/// startup-delayed drain pass and then drains every
/// [`SyncConfig::drain_interval`]; [`stop`](Self::stop) joins it. Remote
/// calls in flight at shutdown are abandoned without being enqueued - a
/// small, documented data-loss window.
pub struct Dispatcher<S: LocalStore, R: RemoteTable + 'static> {
    store: S,
    mirror: Arc<MirrorClient<R>>,
    queue: Arc<SyncQueue>,
    config: SyncConfig,
    worker: Mutex<Option<Worker>>,
    running: AtomicBool,
}

impl<S: LocalStore, R: RemoteTable + 'static> Dispatcher<S, R> {
    /// Builds the facade; the worker is not started yet.
    pub fn new(store: S, remote: R, backend: Box<dyn QueueBackend>, config: SyncConfig) -> Self {
        let queue = Arc::new(SyncQueue::new(backend, config.max_retries));
        Self {
            store,
            mirror: Arc::new(MirrorClient::new(remote)),
            queue,
            config,
            worker: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Spawns the background sync worker. Idempotent.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            debug!("sync worker already running");
            return;
        }

        let (sender, receiver) = mpsc::channel::<Job>();
        let mirror = Arc::clone(&self.mirror);
        let queue = Arc::clone(&self.queue);
        let config = self.config.clone();

        let handle = std::thread::spawn(move || {
            debug!("sync worker started");
            let mut next_drain = Instant::now() + config.startup_delay;
            loop {
                let wait = next_drain.saturating_duration_since(Instant::now());
                match receiver.recv_timeout(wait) {
                    Ok(Job::Mirror(op)) => {
                        if let Err(e) = mirror.attempt(&op) {
                            warn!(action = op.action(), error = %e, "mirror attempt failed, queueing");
                            queue.enqueue(op);
                        }
                    }
                    Ok(Job::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        queue.drain(&mirror);
                        next_drain = Instant::now() + config.drain_interval;
                    }
                }
            }
            debug!("sync worker stopped");
        });

        *worker = Some(Worker { sender, handle });
        self.running.store(true, Ordering::SeqCst);
        info!(
            drain_interval = ?self.config.drain_interval,
            startup_delay = ?self.config.startup_delay,
            "dispatcher started"
        );
    }

    /// Stops and joins the worker. Idempotent.
    pub fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            self.running.store(false, Ordering::SeqCst);
            // The send fails only when the worker already exited.
            let _ = worker.sender.send(Job::Shutdown);
            if worker.handle.join().is_err() {
                warn!("sync worker panicked");
            }
            info!("dispatcher stopped");
        }
    }

    /// Whether the background worker is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs one drain pass synchronously on the calling thread.
    ///
    /// Safe to call while the worker runs; the queue's guard turns an
    /// overlapping pass into a reported skip.
    pub fn drain_now(&self) -> DrainReport {
        self.queue.drain(&self.mirror)
    }

    /// The sync queue, for inspection.
    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// The underlying local store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The mirror client.
    pub fn mirror(&self) -> &MirrorClient<R> {
        &self.mirror
    }

    fn dispatch(&self, op: SyncOp) {
        let worker = self.worker.lock();
        match worker.as_ref() {
            // A send can only fail if the worker thread died; fall back
            // to the queue so the op is not lost.
            Some(w) => {
                if let Err(e) = w.sender.send(Job::Mirror(op.clone())) {
                    warn!(error = %e, "sync worker unreachable, queueing directly");
                    self.queue.enqueue(op);
                }
            }
            None => self.queue.enqueue(op),
        }
    }

    // --- mutations ------------------------------------------------------

    /// Records a new entry locally and mirrors it.
    pub fn add_log(&self, new: NewLog) -> CoreResult<LogRecord> {
        let record = self.store.insert_log(new)?;
        match serde_json::to_value(&record) {
            Ok(row) => self.dispatch(SyncOp::Insert { row }),
            Err(e) => warn!(id = record.id, error = %e, "record not mirrorable"),
        }
        Ok(record)
    }

    /// Updates a record locally and mirrors the changed fields.
    ///
    /// Returns `Ok(false)` for an empty patch or unknown id; nothing is
    /// mirrored in that case.
    pub fn update_log(&self, id: i64, patch: &LogPatch) -> CoreResult<bool> {
        if !self.store.update_log(id, patch)? {
            return Ok(false);
        }
        if let Some(record) = self.store.get_log(id)? {
            match serde_json::to_value(patch) {
                Ok(fields) => self.dispatch(SyncOp::Update {
                    created_at: record.created_at,
                    patch: fields,
                }),
                Err(e) => warn!(id, error = %e, "patch not mirrorable"),
            }
        }
        Ok(true)
    }

    /// Stamps an exit on a record locally and mirrors it.
    ///
    /// The remote side matches heuristically by plate (or name), not by
    /// the correlation key, so every still-active mirror row with the
    /// same plate/name picks up the stamp.
    pub fn exit_log(&self, id: i64, extra: &LogPatch) -> CoreResult<bool> {
        let Some(record) = self.store.get_log(id)? else {
            return Ok(false);
        };

        // One stamp for both sides, so local and mirror rows agree.
        let exit_at = now_iso();
        let mut patch = extra.clone();
        patch.exit_at = Some(exit_at.clone());
        if !self.store.update_log(id, &patch)? {
            return Ok(false);
        }

        match serde_json::to_value(extra) {
            Ok(fields) => self.dispatch(SyncOp::Exit {
                plate: record.plate,
                name: record.name,
                exit_at,
                extra: fields,
            }),
            Err(e) => warn!(id, error = %e, "exit fields not mirrorable"),
        }
        Ok(true)
    }

    /// Deletes a record locally and mirrors the removal.
    pub fn delete_log(&self, id: i64) -> CoreResult<bool> {
        let record = self.store.get_log(id)?;
        if !self.store.delete_log(id)? {
            return Ok(false);
        }
        if let Some(record) = record {
            self.dispatch(SyncOp::Delete {
                created_at: record.created_at,
            });
        }
        Ok(true)
    }

    // --- reads and settings (local only) --------------------------------

    /// Records still on site, newest first.
    pub fn active_logs(&self) -> CoreResult<Vec<LogRecord>> {
        self.store.active_logs()
    }

    /// All records, newest first, truncated to `limit`.
    pub fn all_logs(&self, limit: usize) -> CoreResult<Vec<LogRecord>> {
        self.store.all_logs(limit)
    }

    /// Records within an inclusive calendar-day range.
    pub fn logs_by_date_range(&self, from: &str, to: &str) -> CoreResult<Vec<LogRecord>> {
        self.store.logs_by_date_range(from, to)
    }

    /// Single-record lookup.
    pub fn get_log(&self, id: i64) -> CoreResult<Option<LogRecord>> {
        self.store.get_log(id)
    }

    /// Substring search.
    pub fn search_logs(&self, term: &str, limit: usize) -> CoreResult<Vec<LogRecord>> {
        self.store.search_logs(term, limit)
    }

    /// Dashboard counters.
    pub fn stats(&self) -> CoreResult<Stats> {
        self.store.stats()
    }

    /// Persists a settings value. Settings are local-only, never mirrored.
    pub fn set_setting(&self, key: &str, value: &Value) -> CoreResult<()> {
        self.store.set_setting(key, value)
    }

    /// Reads a settings value.
    pub fn get_setting(&self, key: &str) -> CoreResult<Option<Value>> {
        self.store.get_setting(key)
    }
}

impl<S: LocalStore, R: RemoteTable + 'static> Drop for Dispatcher<S, R> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatelog_core::{LogKind, MemoryStore};
    use gatelog_sync::{MemoryQueueBackend, MockRemoteTable};

    fn dispatcher() -> Dispatcher<MemoryStore, MockRemoteTable> {
        Dispatcher::new(
            MemoryStore::new(),
            MockRemoteTable::new(),
            Box::new(MemoryQueueBackend::new()),
            SyncConfig::default(),
        )
    }

    fn vehicle(plate: &str) -> NewLog {
        NewLog {
            plate: Some(plate.into()),
            driver: Some("A. Kaya".into()),
            ..NewLog::of_kind(LogKind::Vehicle)
        }
    }

    #[test]
    fn stopped_dispatcher_queues_mutations() {
        let d = dispatcher();
        let record = d.add_log(vehicle("34 ABC 123")).unwrap();

        // Local write landed, op waits in the queue.
        assert_eq!(d.get_log(record.id).unwrap().unwrap().id, record.id);
        assert_eq!(d.queue().pending(), 1);
        assert!(matches!(
            d.queue().entries()[0].op,
            SyncOp::Insert { .. }
        ));
        assert_eq!(d.mirror().remote().call_count(), 0);
    }

    #[test]
    fn drain_now_delivers_queued_ops() {
        let d = dispatcher();
        d.add_log(vehicle("34 ABC 123")).unwrap();

        let report = d.drain_now();
        assert_eq!(report.delivered, 1);
        assert_eq!(d.queue().pending(), 0);

        let rows = d.mirror().remote().rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["plate"], "34 ABC 123");
        assert!(rows[0].get("id").is_none());
    }

    #[test]
    fn update_mirrors_only_changed_fields_by_created_at() {
        let d = dispatcher();
        let record = d.add_log(vehicle("34 ABC 123")).unwrap();

        let patch = LogPatch {
            host: Some("Warehouse".into()),
            ..LogPatch::default()
        };
        assert!(d.update_log(record.id, &patch).unwrap());

        let entries = d.queue().entries();
        match &entries[1].op {
            SyncOp::Update { created_at, patch } => {
                assert_eq!(created_at, &record.created_at);
                assert_eq!(patch.as_object().unwrap().len(), 1);
                assert_eq!(patch["host"], "Warehouse");
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn update_of_unknown_id_mirrors_nothing() {
        let d = dispatcher();
        let patch = LogPatch {
            host: Some("x".into()),
            ..LogPatch::default()
        };
        assert!(!d.update_log(999, &patch).unwrap());
        assert!(!d.update_log(1, &LogPatch::default()).unwrap());
        assert_eq!(d.queue().pending(), 0);
    }

    #[test]
    fn exit_sends_heuristic_op_with_matching_stamp() {
        let d = dispatcher();
        let record = d.add_log(vehicle("34 ABC 123")).unwrap();
        assert!(d.exit_log(record.id, &LogPatch::default()).unwrap());

        let local = d.get_log(record.id).unwrap().unwrap();
        let local_exit = local.exit_at.clone().unwrap();
        match &d.queue().entries()[1].op {
            SyncOp::Exit {
                plate,
                name,
                exit_at,
                ..
            } => {
                assert_eq!(plate.as_deref(), Some("34 ABC 123"));
                assert_eq!(name.as_deref(), None);
                assert_eq!(exit_at, &local_exit);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn delete_mirrors_by_created_at() {
        let d = dispatcher();
        let record = d.add_log(vehicle("34 ABC 123")).unwrap();
        assert!(d.delete_log(record.id).unwrap());
        assert!(!d.delete_log(record.id).unwrap());

        match &d.queue().entries()[1].op {
            SyncOp::Delete { created_at } => assert_eq!(created_at, &record.created_at),
            other => panic!("unexpected op: {other:?}"),
        }
    }
}
