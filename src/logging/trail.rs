//! In-memory log recorder.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::Level;

use super::{GuardLogger, LogChannel, LogRecord};

/// Keeps every logged record in memory.
///
/// Useful in tests, and for embedders that want to inspect what a guard
/// logged for one navigation before shipping it elsewhere.
///
/// # Example
///
/// ```
/// use route_guard::logging::{GuardLogger, LogChannel, LogRecord, LogTrail};
/// use tracing::Level;
///
/// let trail = LogTrail::new();
/// trail.log(LogRecord::new(LogChannel::Security, Level::WARN, "Rejected redirect"));
///
/// assert_eq!(trail.len(), 1);
/// assert_eq!(trail.count(LogChannel::Security, Level::WARN), 1);
/// ```
#[derive(Debug, Default)]
pub struct LogTrail {
    records: Mutex<Vec<LogRecord>>,
}

impl LogTrail {
    /// Creates an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded entries, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Returns the entries on `channel` at `level`.
    pub fn matching(&self, channel: LogChannel, level: Level) -> Vec<LogRecord> {
        self.lock()
            .iter()
            .filter(|record| record.channel == channel && record.level == level)
            .cloned()
            .collect()
    }

    /// Counts the entries on `channel` at `level`.
    pub fn count(&self, channel: LogChannel, level: Level) -> usize {
        self.lock()
            .iter()
            .filter(|record| record.channel == channel && record.level == level)
            .count()
    }

    /// Counts the entries at `level` or more severe, on any channel.
    pub fn count_at_least(&self, level: Level) -> usize {
        // tracing orders levels by verbosity: ERROR < WARN < ... < TRACE.
        self.lock()
            .iter()
            .filter(|record| record.level <= level)
            .count()
    }

    /// Returns the number of recorded entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clears all recorded entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GuardLogger for LogTrail {
    fn log(&self, record: LogRecord) {
        self.lock().push(record);
    }
}
