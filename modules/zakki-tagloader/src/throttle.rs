//! Sliding-window request throttle.
//!
//! Keeps a log of recent request timestamps. A request may proceed while the
//! number of entries inside the trailing window is below the ceiling. Bursts
//! up to the ceiling are allowed; after that callers get
//! [`ZakkiError::RateLimited`] until the window slides. Nothing is queued.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;
use zakki_common::{Config, Result, ZakkiError};

pub struct RequestThrottle {
    limit: usize,
    window: Duration,
    log: Mutex<VecDeque<Instant>>,
}

impl RequestThrottle {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            log: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rate_limit, config.rate_window)
    }

    pub fn can_proceed(&self) -> bool {
        self.can_proceed_at(Instant::now())
    }

    /// Append the current time to the log.
    pub fn record(&self) {
        self.record_at(Instant::now());
    }

    /// Check and record in one step, so two concurrent callers cannot both
    /// take the last slot.
    pub fn acquire(&self) -> Result<()> {
        self.acquire_at(Instant::now())
    }

    /// Requests currently inside the window.
    pub fn in_window(&self) -> usize {
        let mut log = self.lock();
        prune(&mut log, Instant::now(), self.window);
        log.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn can_proceed_at(&self, now: Instant) -> bool {
        let mut log = self.lock();
        prune(&mut log, now, self.window);
        log.len() < self.limit
    }

    pub(crate) fn record_at(&self, now: Instant) {
        let mut log = self.lock();
        log.push_back(now);
        prune(&mut log, now, self.window);
    }

    pub(crate) fn acquire_at(&self, now: Instant) -> Result<()> {
        let mut log = self.lock();
        prune(&mut log, now, self.window);
        if log.len() >= self.limit {
            warn!(
                limit = self.limit,
                window_secs = self.window.as_secs(),
                "Request rejected by throttle"
            );
            return Err(ZakkiError::RateLimited {
                limit: self.limit,
                window_secs: self.window.as_secs(),
            });
        }
        log.push_back(now);
        Ok(())
    }

    // The log holds plain timestamps, so a poisoned lock is still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drop entries that are a full window old or older.
fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = log.front() {
        if now.saturating_duration_since(oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}
