//! Configuration for the sync layer.

use std::time::Duration;

/// Tunables for queue draining and remote calls.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often the background drain pass runs.
    pub drain_interval: Duration,
    /// Delay before the first drain pass after startup, so the drain
    /// does not contend with initial UI load.
    pub startup_delay: Duration,
    /// Failed drain attempts after which an entry is dropped.
    pub max_retries: u32,
    /// Bound on each individual remote call, so a hung call cannot stall
    /// the drain timer.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the drain interval.
    #[must_use]
    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    /// Sets the startup delay before the first drain.
    #[must_use]
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Sets the drop threshold for failed entries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drain_interval: Duration::from_secs(30),
            startup_delay: Duration::from_secs(5),
            max_retries: 3,
            request_timeout: Duration::from_secs(10),
        }
    }
}
