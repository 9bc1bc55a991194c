//! Event-driven monitoring.
//!
//! # Overview
//!
//! [`Monitor`] is either stopped or running. Starting it:
//!
//! 1. requires at least one configured watched folder
//! 2. acquires the single-instance lock
//! 3. subscribes a recursive `notify` watcher to every existing folder
//! 4. spawns one worker thread that handles creation events in order
//!
//! The watcher callbacks only forward paths over a channel, so all
//! classification and quarantine work is serialized on the worker. Each
//! event waits until it is at least `SETTLE_DELAY` old so the writer has
//! a chance to finish.
//!
//! # Stopping
//!
//! [`Monitor::stop`] stops accepting events, drops the watchers and joins
//! the worker. An event already being handled runs to completion; events
//! still queued are discarded. The worker owns the instance lock, so the
//! lock is released once it exits. Stopping twice is a no-op and dropping
//! a running monitor stops it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use super::handler::DuplicateHandler;
use super::lock::{InstanceLock, LockError};
use super::stats::{SessionStats, StatsSnapshot};
use crate::config::{AppPaths, Config};

/// How often the worker wakes up to check for stop and refresh the lock.
const WORKER_TICK: Duration = Duration::from_millis(200);

/// Interval between lock refreshes.
const LOCK_HEARTBEAT: Duration = Duration::from_secs(5 * 60);

/// Minimum age of a creation event before it is handled. Creation is
/// reported when the file is opened, usually before its content is written.
const SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Errors starting the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No folder is configured.
    #[error("no watched folders configured")]
    NoFolders,

    /// Folders are configured but none could be watched.
    #[error("none of the watched folders could be watched")]
    NoWatchableFolders,

    /// The single-instance lock is unavailable.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The event subscription could not be created.
    #[error("cannot watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The worker thread could not be spawned.
    #[error("cannot start worker thread: {0}")]
    Worker(#[source] std::io::Error),
}

/// Monitor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

/// A created filesystem entry forwarded to the worker.
#[derive(Debug)]
struct Created {
    path: PathBuf,
    is_dir: bool,
    seen: Instant,
}

struct Running {
    watchers: Vec<RecommendedWatcher>,
    accepting: Arc<AtomicBool>,
    worker: JoinHandle<()>,
    stats: Arc<SessionStats>,
    folders: Vec<PathBuf>,
}

/// Watches folders and quarantines duplicates as they appear.
pub struct Monitor {
    folders: Vec<PathBuf>,
    lock_path: PathBuf,
    handler: DuplicateHandler,
    running: Option<Running>,
    last_stats: Option<Arc<SessionStats>>,
}

impl Monitor {
    /// Create a stopped monitor.
    #[must_use]
    pub fn new(folders: Vec<PathBuf>, lock_path: PathBuf, handler: DuplicateHandler) -> Self {
        Self {
            folders,
            lock_path,
            handler,
            running: None,
            last_stats: None,
        }
    }

    /// Create a stopped monitor from the application config.
    #[must_use]
    pub fn from_config(config: &Config, paths: &AppPaths) -> Self {
        Self::new(
            config.watched_folders.clone(),
            paths.lock_file.clone(),
            DuplicateHandler::from_config(config),
        )
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        if self.running.is_some() {
            MonitorState::Running
        } else {
            MonitorState::Stopped
        }
    }

    /// Whether the monitor is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Folders actually being watched (empty when stopped).
    #[must_use]
    pub fn active_folders(&self) -> &[PathBuf] {
        self.running
            .as_ref()
            .map(|r| r.folders.as_slice())
            .unwrap_or(&[])
    }

    /// Statistics of the running session, or of the last one after stop.
    #[must_use]
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.running
            .as_ref()
            .map(|r| &r.stats)
            .or(self.last_stats.as_ref())
            .map(|s| s.snapshot())
    }

    /// Start monitoring. Does nothing if already running.
    ///
    /// Folders that do not exist are logged and skipped. Statistics start
    /// from zero.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::NoFolders`] if no folder is configured
    /// - [`MonitorError::Lock`] if another monitor holds the lock
    /// - [`MonitorError::NoWatchableFolders`] if no folder could be watched
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if self.is_running() {
            log::warn!("Monitor is already running");
            return Ok(());
        }
        if self.folders.is_empty() {
            return Err(MonitorError::NoFolders);
        }

        let lock = InstanceLock::acquire(&self.lock_path)?;

        let stats = Arc::new(SessionStats::new());
        let handler = self.handler.clone().with_stats(Arc::clone(&stats));
        let accepting = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel::<Created>();

        let mut watchers = Vec::new();
        let mut folders = Vec::new();
        for folder in &self.folders {
            if !folder.is_dir() {
                log::warn!("Watched folder does not exist, skipping: {}", folder.display());
                continue;
            }
            match subscribe(folder, tx.clone(), Arc::clone(&accepting)) {
                Ok(watcher) => {
                    log::info!("Watching: {}", folder.display());
                    watchers.push(watcher);
                    folders.push(folder.clone());
                }
                Err(e) => log::error!("{}", e),
            }
        }
        drop(tx);

        if watchers.is_empty() {
            return Err(MonitorError::NoWatchableFolders);
        }

        log::info!(
            "Monitoring started - Detection: {}{}",
            handler.settings().summary(),
            if handler.quarantine().is_dry_run() {
                " [DRY RUN]"
            } else {
                ""
            }
        );

        let worker_accepting = Arc::clone(&accepting);
        let worker = thread::Builder::new()
            .name("dupeguard-worker".to_string())
            .spawn(move || run_worker(&rx, &handler, &worker_accepting, lock))
            .map_err(MonitorError::Worker)?;

        self.running = Some(Running {
            watchers,
            accepting,
            worker,
            stats,
            folders,
        });
        Ok(())
    }

    /// Stop monitoring and release the lock. Idempotent.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.accepting.store(false, Ordering::SeqCst);
        drop(running.watchers);
        if running.worker.join().is_err() {
            log::error!("Monitor worker thread panicked");
        }

        let snapshot = running.stats.snapshot();
        log::info!(
            "Monitoring stopped - checked {} files, found {} duplicates",
            snapshot.files_checked,
            snapshot.duplicates_found
        );
        self.last_stats = Some(running.stats);
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("folders", &self.folders)
            .field("lock_path", &self.lock_path)
            .field("state", &self.state())
            .finish()
    }
}

fn subscribe(
    folder: &Path,
    tx: mpsc::Sender<Created>,
    accepting: Arc<AtomicBool>,
) -> Result<RecommendedWatcher, MonitorError> {
    let watch_err = |source: notify::Error| MonitorError::Watch {
        path: folder.to_path_buf(),
        source,
    };

    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| {
            if !accepting.load(Ordering::SeqCst) {
                return;
            }
            match result {
                Ok(event) => {
                    let EventKind::Create(kind) = event.kind else {
                        return;
                    };
                    let seen = Instant::now();
                    for path in event.paths {
                        let is_dir = kind == CreateKind::Folder || path.is_dir();
                        let _ = tx.send(Created { path, is_dir, seen });
                    }
                }
                Err(e) => log::error!("Watch error: {}", e),
            }
        },
        notify::Config::default(),
    )
    .map_err(watch_err)?;

    watcher
        .watch(folder, RecursiveMode::Recursive)
        .map_err(watch_err)?;
    Ok(watcher)
}

fn run_worker(
    rx: &Receiver<Created>,
    handler: &DuplicateHandler,
    accepting: &AtomicBool,
    lock: InstanceLock,
) {
    let mut last_refresh = Instant::now();
    while accepting.load(Ordering::SeqCst) {
        match rx.recv_timeout(WORKER_TICK) {
            Ok(event) => {
                let age = event.seen.elapsed();
                if age < SETTLE_DELAY {
                    thread::sleep(SETTLE_DELAY - age);
                }
                if accepting.load(Ordering::SeqCst) {
                    handler.on_created(&event.path, event.is_dir);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_refresh.elapsed() >= LOCK_HEARTBEAT {
            if let Err(e) = lock.refresh() {
                log::warn!("Could not refresh lock file {}: {}", lock.path().display(), e);
            }
            last_refresh = Instant::now();
        }
    }
    drop(lock);
}
