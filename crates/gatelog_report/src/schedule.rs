//! Background schedule firing the daily report.

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use gatelog_core::now_iso;
use parking_lot::Mutex;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

/// The work the scheduler runs once a day; typically a closure around
/// [`crate::send_daily_report`].
pub type ReportJob = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone)]
struct LastRun {
    time: String,
    ok: bool,
}

struct Worker {
    sender: Sender<()>,
    handle: JoinHandle<()>,
}

/// Snapshot of the scheduler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleStatus {
    /// Whether the schedule thread is running.
    pub running: bool,
    /// `HH:MM` fire time (local).
    pub schedule: String,
    /// When the job last ran, RFC 3339.
    pub last_run_time: Option<String>,
    /// Whether the last run succeeded.
    pub last_run_ok: Option<bool>,
    /// Next fire time, `YYYY-MM-DD HH:MM` local, when running.
    pub next_run: Option<String>,
}

/// Fires a [`ReportJob`] once a day at a fixed local `HH:MM`.
///
/// Explicit lifecycle: nothing runs until [`start`](Self::start);
/// [`stop`](Self::stop) joins the thread; [`restart`](Self::restart) is
/// the settings-changed path. A failing job is recorded in the status
/// and retried at the next scheduled time, never earlier.
pub struct ReportScheduler {
    hour: u32,
    minute: u32,
    job: ReportJob,
    last_run: Arc<Mutex<Option<LastRun>>>,
    worker: Mutex<Option<Worker>>,
}

impl ReportScheduler {
    /// Creates a stopped scheduler. Out-of-range times are clamped.
    pub fn new(hour: u32, minute: u32, job: ReportJob) -> Self {
        Self {
            hour: hour.min(23),
            minute: minute.min(59),
            job,
            last_run: Arc::new(Mutex::new(None)),
            worker: Mutex::new(None),
        }
    }

    /// Starts the schedule thread. Idempotent.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }

        let (sender, receiver) = mpsc::channel::<()>();
        let (hour, minute) = (self.hour, self.minute);
        let job = Arc::clone(&self.job);
        let last_run = Arc::clone(&self.last_run);

        let handle = std::thread::spawn(move || loop {
            let now = Local::now().naive_local();
            let next = next_occurrence(now, hour, minute);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            match receiver.recv_timeout(wait) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    info!("running scheduled report job");
                    let ok = match job() {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(error = %e, "scheduled report job failed");
                            false
                        }
                    };
                    *last_run.lock() = Some(LastRun {
                        time: now_iso(),
                        ok,
                    });
                }
            }
        });

        *worker = Some(Worker { sender, handle });
        info!(schedule = %format!("{hour:02}:{minute:02}"), "report scheduler started");
    }

    /// Stops and joins the schedule thread. Idempotent.
    pub fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.sender.send(());
            if worker.handle.join().is_err() {
                warn!("report scheduler thread panicked");
            }
            info!("report scheduler stopped");
        }
    }

    /// Stop-then-start, for when the settings changed.
    pub fn restart(&self) {
        self.stop();
        self.start();
    }

    /// Whether the schedule thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Current state, including last and next run.
    pub fn status(&self) -> ScheduleStatus {
        let running = self.is_running();
        let last = self.last_run.lock().clone();
        ScheduleStatus {
            running,
            schedule: format!("{:02}:{:02}", self.hour, self.minute),
            last_run_time: last.as_ref().map(|r| r.time.clone()),
            last_run_ok: last.as_ref().map(|r| r.ok),
            next_run: running.then(|| {
                next_occurrence(Local::now().naive_local(), self.hour, self.minute)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            }),
        }
    }
}

impl Drop for ReportScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The next strictly-future occurrence of `hour:minute` after `now`.
fn next_occurrence(now: NaiveDateTime, hour: u32, minute: u32) -> NaiveDateTime {
    let today = now
        .date()
        .and_hms_opt(hour.min(23), minute.min(59), 0)
        .unwrap_or(now);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}
