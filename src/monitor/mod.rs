//! Monitoring: reacting to new files and scanning for old ones.
//!
//! - [`watcher`]: the [`Monitor`] state machine over `notify` subscriptions
//! - [`scan`]: one-shot walk of existing files
//! - [`handler`]: the duplicate-handling path both of them share
//! - [`lock`]: single-instance lock file
//! - [`stats`]: per-session counters

pub mod handler;
pub mod lock;
pub mod scan;
pub mod stats;
pub mod watcher;

pub use handler::{DuplicateHandler, HandleOutcome};
pub use lock::{InstanceLock, LockError, STALE_AFTER, UNREADABLE_GRACE};
pub use scan::{find_candidates, scan_folders, ScanSummary};
pub use stats::{SessionStats, StatsSnapshot};
pub use watcher::{Monitor, MonitorError, MonitorState};
