//! Single-instance lock.
//!
//! The lock is a file holding the owner's process id. The id is written to
//! a private temporary file first, which is then hard-linked into place, so
//! the lock file never exists without its id and two processes cannot both
//! create it. An existing lock is stale, and gets replaced, when its
//! process is gone or the file has not been touched for [`STALE_AFTER`].
//! A lock without a readable id only counts as stale once it is older than
//! [`UNREADABLE_GRACE`]. A running monitor refreshes the file periodically
//! so it never ages out while alive.
//!
//! [`InstanceLock`] releases the file when dropped, including during unwinding.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use sysinfo::{Pid, System};
use thiserror::Error;

/// Age after which an untouched lock file is considered abandoned.
pub const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Age before a lock file without a readable process id is considered abandoned.
pub const UNREADABLE_GRACE: Duration = Duration::from_secs(10);

/// Errors acquiring the instance lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// A live process holds the lock.
    #[error("another monitor is already running (pid {pid})")]
    Held { pid: u32 },

    /// The lock file could not be created, read or removed.
    #[error("lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Held single-instance lock. Dropping it removes the lock file.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    pid: u32,
}

impl InstanceLock {
    /// Acquire the lock at `path` with the default staleness threshold.
    ///
    /// # Errors
    ///
    /// [`LockError::Held`] if a live process owns a fresh lock, otherwise
    /// [`LockError::Io`].
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        Self::acquire_with(path, STALE_AFTER)
    }

    /// Acquire the lock, treating files older than `stale_after` as abandoned.
    ///
    /// # Errors
    ///
    /// See [`InstanceLock::acquire`].
    pub fn acquire_with(path: &Path, stale_after: Duration) -> Result<Self, LockError> {
        let io_err = |source: io::Error| LockError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let pid = std::process::id();
        for _ in 0..2 {
            match create_with_pid(path, pid) {
                Ok(()) => {
                    log::debug!("Acquired instance lock {}", path.display());
                    return Ok(Self {
                        path: path.to_path_buf(),
                        pid,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    match inspect(path, stale_after) {
                        Holder::Live(holder) => return Err(LockError::Held { pid: holder }),
                        Holder::Stale(why) => {
                            log::warn!("Removing stale lock file {} ({})", path.display(), why);
                            match fs::remove_file(path) {
                                Ok(()) => {}
                                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                                Err(e) => return Err(io_err(e)),
                            }
                        }
                    }
                }
                Err(e) => return Err(io_err(e)),
            }
        }

        // Lost a race with another process creating the file.
        Err(LockError::Held {
            pid: read_pid(path).unwrap_or(0),
        })
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the lock file so its age restarts.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from rewriting the file.
    pub fn refresh(&self) -> io::Result<()> {
        let staged = staging_path(&self.path, self.pid);
        fs::write(&staged, self.pid.to_string())?;
        fs::rename(&staged, &self.path).inspect_err(|_| {
            let _ = fs::remove_file(&staged);
        })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if read_pid(&self.path) != Some(self.pid) {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Released instance lock {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove lock file {}: {}", self.path.display(), e),
        }
    }
}

enum Holder {
    Live(u32),
    Stale(String),
}

/// Create `path` holding `pid`, failing with `AlreadyExists` if it exists.
fn create_with_pid(path: &Path, pid: u32) -> io::Result<()> {
    let staged = staging_path(path, pid);
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&staged)?;
    let linked = write!(file, "{pid}")
        .and_then(|()| file.sync_all())
        .and_then(|()| fs::hard_link(&staged, path));
    drop(file);
    let _ = fs::remove_file(&staged);
    linked
}

/// Private file next to the lock, unique per process and call.
fn staging_path(path: &Path, pid: u32) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{pid}.{n}.tmp"));
    PathBuf::from(name)
}

fn inspect(path: &Path, stale_after: Duration) -> Holder {
    let age = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .unwrap_or_default();

    let Some(pid) = read_pid(path) else {
        if age < UNREADABLE_GRACE {
            return Holder::Live(0);
        }
        return Holder::Stale("no process id".to_string());
    };
    if !is_process_alive(pid) {
        return Holder::Stale(format!("process {pid} is not running"));
    }
    if age > stale_after {
        return Holder::Stale(format!("untouched for {}s", age.as_secs()));
    }
    Holder::Live(pid)
}

/// Process id recorded in the lock file, if readable.
#[must_use]
pub fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether a process with this id currently exists.
#[must_use]
pub fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_process(Pid::from_u32(pid))
}
