//! Session statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;

/// Counters for one monitoring session. Shared between threads by reference.
#[derive(Debug)]
pub struct SessionStats {
    started_at: DateTime<Local>,
    started: Instant,
    checked: AtomicU64,
    duplicates: AtomicU64,
    quarantined: AtomicU64,
    failures: AtomicU64,
}

impl SessionStats {
    /// Fresh counters starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            started: Instant::now(),
            checked: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            quarantined: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// A candidate passed the pattern matcher.
    pub fn record_checked(&self) {
        self.checked.fetch_add(1, Ordering::Relaxed);
    }

    /// A candidate was confirmed as a duplicate (dry run included).
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// A duplicate was moved into quarantine.
    pub fn record_quarantined(&self) {
        self.quarantined.fetch_add(1, Ordering::Relaxed);
    }

    /// A confirmed duplicate could not be moved.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started_at: self.started_at,
            uptime: self.started.elapsed(),
            files_checked: self.checked.load(Ordering::Relaxed),
            duplicates_found: self.duplicates.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics at one moment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub started_at: DateTime<Local>,
    pub uptime: Duration,
    pub files_checked: u64,
    pub duplicates_found: u64,
    pub quarantined: u64,
    pub failures: u64,
}

impl StatsSnapshot {
    /// Share of checked candidates that were duplicates, in percent.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.files_checked == 0 {
            0.0
        } else {
            self.duplicates_found as f64 / self.files_checked as f64 * 100.0
        }
    }

    /// Uptime as `H:MM:SS`.
    #[must_use]
    pub fn uptime_display(&self) -> String {
        let secs = self.uptime.as_secs();
        format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
    }
}
