//! Fixed-window attempt counter keyed by identifier.
//!
//! A window opens on the first attempt for an identifier and lasts
//! `window_ms`. Inside the window at most `max_attempts` attempts are
//! allowed; further attempts are denied until the window expires. There is
//! no smoothing across windows, so a burst straddling a boundary can see up
//! to twice `max_attempts` allowed attempts in quick succession.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;

/// Attempt bookkeeping for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Attempts counted in the current window (always at least 1).
    pub count: u32,
    /// Instant after which the window is considered expired.
    pub window_reset_at: Instant,
}

/// Per-identifier fixed-window rate limiter.
///
/// Construct one instance and share it (behind an [`Arc`]) between every
/// guard that should count against the same table.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use route_guard::{ManualClock, RateLimitConfig, RateLimiter};
///
/// let limiter = RateLimiter::with_clock(
///     RateLimitConfig { window_ms: 60_000, max_attempts: 2 },
///     Arc::new(ManualClock::new()),
/// );
///
/// assert!(limiter.track_attempt("auth:/dashboard"));
/// assert!(limiter.track_attempt("auth:/dashboard"));
/// assert!(!limiter.track_attempt("auth:/dashboard"));
/// assert!(limiter.track_attempt("auth:/settings"));
/// ```
pub struct RateLimiter {
    window: Duration,
    max_attempts: u32,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<String, AttemptRecord>>,
}

impl RateLimiter {
    /// Creates a limiter reading time from the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a limiter reading time from `clock`.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: Duration::from_millis(config.window_ms),
            max_attempts: config.max_attempts,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Records an attempt for `identifier` and reports whether it is allowed.
    ///
    /// Returns `false` once the identifier has used up `max_attempts` in the
    /// current window. A denied attempt does not touch the record.
    pub fn track_attempt(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        let mut records = self.records();

        match records.get_mut(identifier) {
            Some(record) if now <= record.window_reset_at => {
                if record.count < self.max_attempts {
                    record.count += 1;
                    true
                } else {
                    false
                }
            }
            _ => {
                records.insert(
                    identifier.to_string(),
                    AttemptRecord {
                        count: 1,
                        window_reset_at: now + self.window,
                    },
                );
                true
            }
        }
    }

    /// Returns the attempt count for `identifier` in its live window.
    ///
    /// Expired or unknown identifiers report zero.
    pub fn attempts(&self, identifier: &str) -> u32 {
        let now = self.clock.now();
        self.records()
            .get(identifier)
            .filter(|record| now <= record.window_reset_at)
            .map_or(0, |record| record.count)
    }

    /// Returns a copy of the record for `identifier`, expired or not.
    pub fn record(&self, identifier: &str) -> Option<AttemptRecord> {
        self.records().get(identifier).cloned()
    }

    /// Drops every record whose window has expired.
    ///
    /// Returns the number of records removed. The limiter never calls this
    /// itself; long-lived processes with unbounded identifier sets can call it
    /// periodically.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, record| now <= record.window_reset_at);
        before - records.len()
    }

    /// Returns the number of identifiers currently tracked.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Returns true if no identifier is tracked.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    // The table holds plain counters, so a panic mid-update cannot leave it
    // in a state worth refusing to read.
    fn records(&self) -> MutexGuard<'_, HashMap<String, AttemptRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("window", &self.window)
            .field("max_attempts", &self.max_attempts)
            .field("tracked", &self.len())
            .finish()
    }
}
