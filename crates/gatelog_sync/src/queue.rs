//! Durable FIFO retry buffer for failed mirror operations.

use crate::error::{SyncError, SyncResult};
use crate::mirror::MirrorClient;
use crate::op::{QueueEntry, SyncOp};
use crate::remote::RemoteTable;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Where the persisted queue blob lives.
///
/// The queue is one ordered JSON array under a well-known key; the
/// backend only moves the blob, it never interprets it.
pub trait QueueBackend: Send + Sync {
    /// Reads the current blob, `None` when nothing was persisted yet.
    fn read(&self) -> SyncResult<Option<String>>;

    /// Replaces the blob atomically.
    fn write(&self, blob: &str) -> SyncResult<()>;
}

/// File name of the persisted queue blob.
pub const QUEUE_FILE: &str = "sync_queue.json";

/// File-backed queue blob (desktop variant).
#[derive(Debug)]
pub struct FileQueueBackend {
    path: PathBuf,
}

impl FileQueueBackend {
    /// Persists the blob at `data_dir/sync_queue.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(QUEUE_FILE),
        }
    }
}

impl QueueBackend for FileQueueBackend {
    fn read(&self) -> SyncResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::QueueStorage(e)),
        }
    }

    fn write(&self, blob: &str) -> SyncResult<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory queue blob (browser-storage analogue, also the test
/// backend).
#[derive(Debug, Default)]
pub struct MemoryQueueBackend {
    blob: Mutex<Option<String>>,
}

impl MemoryQueueBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueBackend for MemoryQueueBackend {
    fn read(&self) -> SyncResult<Option<String>> {
        Ok(self.blob.lock().clone())
    }

    fn write(&self, blob: &str) -> SyncResult<()> {
        *self.blob.lock() = Some(blob.to_string());
        Ok(())
    }
}

/// Summary of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries attempted in this pass.
    pub attempted: usize,
    /// Entries delivered and removed.
    pub delivered: usize,
    /// Entries kept for another pass.
    pub requeued: usize,
    /// Entries dropped at the retry cap.
    pub dropped: usize,
    /// True when the pass was skipped because another was in flight.
    pub skipped: bool,
}

impl DrainReport {
    fn skipped_pass() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// At-least-once delivery buffer for remote-mirror operations that
/// failed on first attempt.
///
/// The ordered entry list is held in memory and mirrored to the backend
/// after every change; the persisted blob is the recovery source on the
/// next startup. A corrupt blob recovers as an empty queue, never a
/// startup error. There is no per-entry deduplication: two independent
/// failures of the same logical mutation queue twice.
pub struct SyncQueue {
    backend: Box<dyn QueueBackend>,
    entries: Mutex<Vec<QueueEntry>>,
    draining: AtomicBool,
    max_retries: u32,
}

impl SyncQueue {
    /// Loads the queue from its backend.
    pub fn new(backend: Box<dyn QueueBackend>, max_retries: u32) -> Self {
        let entries = match backend.read() {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<QueueEntry>>(&blob) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(error = %e, "corrupt sync queue blob, resetting to empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "sync queue unreadable, resetting to empty");
                Vec::new()
            }
        };
        if !entries.is_empty() {
            info!(pending = entries.len(), "sync queue restored");
        }

        Self {
            backend,
            entries: Mutex::new(entries),
            draining: AtomicBool::new(false),
            max_retries,
        }
    }

    /// Number of pending entries.
    pub fn pending(&self) -> usize {
        self.entries.lock().len()
    }

    /// Snapshot of the pending entries, oldest first.
    pub fn entries(&self) -> Vec<QueueEntry> {
        self.entries.lock().clone()
    }

    /// Appends a failed operation for later retry.
    ///
    /// Best-effort: a persistence failure is logged and swallowed, the
    /// entry still lives in memory for this session.
    pub fn enqueue(&self, op: SyncOp) {
        let mut entries = self.entries.lock();
        debug!(action = op.action(), pending = entries.len() + 1, "sync op queued");
        entries.push(QueueEntry::new(op));
        self.persist(&entries);
    }

    /// Runs one full delivery pass over the queued entries.
    ///
    /// Not reentrant: a pass invoked while another is in flight is
    /// skipped (reported via [`DrainReport::skipped`]) so retry counts
    /// are never double-counted and the persisted blob is never raced.
    /// Individual failures never propagate; the pass itself cannot fail.
    pub fn drain<R: RemoteTable>(&self, mirror: &MirrorClient<R>) -> DrainReport {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("drain already in flight, skipping");
            return DrainReport::skipped_pass();
        }

        let report = self.drain_locked(mirror);
        self.draining.store(false, Ordering::SeqCst);
        report
    }

    fn drain_locked<R: RemoteTable>(&self, mirror: &MirrorClient<R>) -> DrainReport {
        let snapshot = self.entries.lock().clone();
        if snapshot.is_empty() {
            return DrainReport::default();
        }

        let snapshot_len = snapshot.len();
        let mut report = DrainReport {
            attempted: snapshot_len,
            ..DrainReport::default()
        };
        let mut survivors = Vec::new();

        for mut entry in snapshot {
            match mirror.attempt(&entry.op) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    entry.retries += 1;
                    if entry.retries < self.max_retries {
                        debug!(
                            action = entry.op.action(),
                            retries = entry.retries,
                            error = %e,
                            "sync retry failed, keeping entry"
                        );
                        report.requeued += 1;
                        survivors.push(entry);
                    } else {
                        warn!(
                            action = entry.op.action(),
                            retries = entry.retries,
                            error = %e,
                            "sync entry dropped at retry cap"
                        );
                        report.dropped += 1;
                    }
                }
            }
        }

        // Entries enqueued while the pass ran sit past the snapshot
        // length (only drain ever removes entries); splice them back in
        // behind the survivors.
        let mut entries = self.entries.lock();
        let tail = entries.split_off(snapshot_len);
        *entries = survivors;
        entries.extend(tail);
        self.persist(&entries);

        debug!(
            delivered = report.delivered,
            requeued = report.requeued,
            dropped = report.dropped,
            "drain pass complete"
        );
        report
    }

    fn persist(&self, entries: &[QueueEntry]) {
        let blob = match serde_json::to_string(entries) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "failed to serialize sync queue");
                return;
            }
        };
        if let Err(e) = self.backend.write(&blob) {
            warn!(error = %e, "failed to persist sync queue");
        }
    }
}
