//! Quarantine placement, restore and purge.
//!
//! # Overview
//!
//! [`QuarantineManager`] owns the quarantine root and knows the watched
//! folders so it can preserve directory structure. It provides:
//! - [`QuarantineManager::quarantine`]: move a file aside and write its sidecar
//! - [`QuarantineManager::restore`]: move a file back using its sidecar
//! - [`QuarantineManager::list`]: enumerate quarantined files
//! - [`QuarantineManager::purge_older_than`]: delete old files and prune empty folders
//!
//! # Safety
//!
//! Moves use `rename`. Across filesystems the file is copied to a temporary
//! name, synced, renamed into place, and only then is the source removed.
//! If the sidecar cannot be written the move is undone, so a quarantined
//! file never exists without its record.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDate};
use thiserror::Error;
use walkdir::WalkDir;

use super::placement::{relative_path, unique_destination};
use super::record::{is_sidecar, sidecar_path, RecordError, RestoreInfo};
use crate::config::Config;

const SECONDS_PER_DAY: u64 = 86_400;

/// Error type for quarantine operations.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// File was not found (may have been moved or deleted meanwhile).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when moving the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The restore record could not be written; the move was undone.
    #[error("cannot write restore info {path}: {source}")]
    SidecarWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl QuarantineError {
    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }

    /// Path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::SidecarWrite { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// Error type for restore operations.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// No quarantined file has this name.
    #[error("file not found in quarantine: {0}")]
    NotInQuarantine(String),

    /// The quarantined file has no restore record.
    #[error("no restore info for {0}")]
    MissingRecord(PathBuf),

    /// The restore record is unreadable or malformed.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Something already exists at the original location.
    #[error("original location is occupied: {0}")]
    DestinationExists(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A completed quarantine move.
#[derive(Debug, Clone)]
pub struct QuarantineRecord {
    /// Where the file was
    pub source: PathBuf,
    /// Where the file is now
    pub destination: PathBuf,
    /// The sidecar written next to it
    pub sidecar: PathBuf,
    /// Contents of the sidecar
    pub info: RestoreInfo,
}

/// Result of [`QuarantineManager::quarantine`].
#[derive(Debug, Clone)]
pub enum QuarantineOutcome {
    /// The file was moved and its sidecar written.
    Moved(QuarantineRecord),
    /// Dry run: nothing was touched.
    DryRun {
        /// File that would have been moved
        source: PathBuf,
        /// Where it would have gone
        destination: PathBuf,
    },
}

/// A file put back by [`QuarantineManager::restore`].
#[derive(Debug, Clone)]
pub struct RestoredFile {
    /// Location inside quarantine
    pub from: PathBuf,
    /// Original location it was moved back to
    pub to: PathBuf,
    /// The record that was consumed
    pub info: RestoreInfo,
}

/// One quarantined file as found on disk.
#[derive(Debug, Clone)]
pub struct QuarantinedFile {
    /// Full path inside quarantine
    pub path: PathBuf,
    /// Date folder name (`YYYY-MM-DD`), if the file sits inside one
    pub date: Option<String>,
    /// Path below the date folder
    pub relative: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Parsed sidecar, if present and readable
    pub info: Option<RestoreInfo>,
}

/// All quarantined files under a root.
#[derive(Debug, Clone, Default)]
pub struct QuarantineListing {
    /// Files in path order
    pub files: Vec<QuarantinedFile>,
}

impl QuarantineListing {
    /// Number of quarantined files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether quarantine is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Combined size of all files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Files grouped by date folder, newest first.
    #[must_use]
    pub fn by_date(&self) -> Vec<(String, Vec<&QuarantinedFile>)> {
        let mut groups: BTreeMap<String, Vec<&QuarantinedFile>> = BTreeMap::new();
        for file in &self.files {
            let key = file.date.clone().unwrap_or_else(|| "(undated)".to_string());
            groups.entry(key).or_default().push(file);
        }
        groups.into_iter().rev().collect()
    }
}

/// Results of a purge.
#[derive(Debug, Clone, Default)]
pub struct PurgeSummary {
    /// Quarantined files deleted (sidecars not counted)
    pub deleted_files: usize,
    /// Bytes freed by deleted files
    pub freed_bytes: u64,
    /// Empty directories removed
    pub removed_dirs: usize,
    /// Files that could not be deleted
    pub failures: Vec<(PathBuf, String)>,
}

/// Moves duplicates into the quarantine tree and back out again.
#[derive(Debug, Clone)]
pub struct QuarantineManager {
    root: PathBuf,
    watched: Vec<PathBuf>,
    home: Option<PathBuf>,
    dry_run: bool,
}

impl QuarantineManager {
    /// Create a manager for `root` with no watched folders.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            watched: Vec::new(),
            home: directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
            dry_run: false,
        }
    }

    /// Create a manager from the application config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.quarantine_path)
            .with_watched_folders(config.watched_folders.clone())
            .with_dry_run(config.dry_run)
    }

    /// Set the watched folders used for structure preservation.
    #[must_use]
    pub fn with_watched_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.watched = folders;
        self
    }

    /// Override the home directory used as a placement fallback.
    #[must_use]
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Enable/disable dry run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Quarantine root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether moves are suppressed.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Directory a file from `file` would be placed in on `date`.
    #[must_use]
    pub fn destination_dir(&self, file: &Path, date: NaiveDate) -> PathBuf {
        let mut dir = self.root.join(date.format("%Y-%m-%d").to_string());
        if let Some(rel) = relative_path(file, &self.watched, self.home.as_deref()) {
            dir.push(rel);
        }
        dir
    }

    /// Move `file` into quarantine and record why.
    ///
    /// In dry-run mode only the intent is logged.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file vanished
    /// - `PermissionDenied` if it cannot be moved
    /// - `SidecarWrite` if the record could not be written (the move is undone)
    /// - `Io` for any other failure
    ///
    /// The source file is left in place whenever an error is returned.
    pub fn quarantine(
        &self,
        file: &Path,
        reason: &str,
    ) -> Result<QuarantineOutcome, QuarantineError> {
        let metadata = fs::symlink_metadata(file).map_err(|e| QuarantineError::from_io(file, e))?;
        let size = metadata.len();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| QuarantineError::NotFound(file.to_path_buf()))?;
        let dir = self.destination_dir(file, Local::now().date_naive());

        if self.dry_run {
            let destination = unique_destination(&dir, &name);
            log::info!(
                "DRY RUN - WOULD QUARANTINE: {} (Reason: {})",
                file.display(),
                reason
            );
            return Ok(QuarantineOutcome::DryRun {
                source: file.to_path_buf(),
                destination,
            });
        }

        fs::create_dir_all(&dir).map_err(|e| QuarantineError::from_io(&dir, e))?;
        let destination = unique_destination(&dir, &name);
        move_file(file, &destination).map_err(|e| QuarantineError::from_io(file, e))?;

        let original = std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf());
        let info = RestoreInfo::new(original, reason, size);
        let sidecar = sidecar_path(&destination);
        if let Err(e) = info.write(&sidecar) {
            let _ = fs::remove_file(&sidecar);
            if let Err(undo) = move_file(&destination, file) {
                log::error!(
                    "Could not undo quarantine of {} after sidecar failure: {}",
                    file.display(),
                    undo
                );
            }
            return Err(QuarantineError::SidecarWrite {
                path: sidecar,
                source: e,
            });
        }

        log::info!(
            "QUARANTINED: {} -> {} (Size: {} bytes, Reason: {})",
            file.display(),
            destination.display(),
            size,
            reason
        );
        Ok(QuarantineOutcome::Moved(QuarantineRecord {
            source: file.to_path_buf(),
            destination,
            sidecar,
            info,
        }))
    }

    /// Quarantined files named exactly `filename`, in path order.
    #[must_use]
    pub fn find_all(&self, filename: &str) -> Vec<PathBuf> {
        self.quarantined_paths()
            .into_iter()
            .filter(|p| p.file_name().is_some_and(|n| n == filename))
            .collect()
    }

    /// Locate a quarantined file and read its restore record.
    ///
    /// With several matches the newest date folder wins.
    ///
    /// # Errors
    ///
    /// `NotInQuarantine` if nothing matches, `MissingRecord` if no match has
    /// a sidecar, or the record's read error.
    pub fn info(&self, filename: &str) -> Result<(PathBuf, RestoreInfo), RestoreError> {
        let matches = self.find_all(filename);
        if matches.len() > 1 {
            log::debug!("{} quarantined files named {}", matches.len(), filename);
        }
        let chosen = matches
            .iter()
            .rev()
            .find(|p| sidecar_path(p).is_file())
            .or_else(|| matches.last())
            .ok_or_else(|| RestoreError::NotInQuarantine(filename.to_string()))?;

        let sidecar = sidecar_path(chosen);
        if !sidecar.is_file() {
            return Err(RestoreError::MissingRecord(chosen.clone()));
        }
        let info = RestoreInfo::read(&sidecar)?;
        Ok((chosen.clone(), info))
    }

    /// Move a quarantined file back to where it came from.
    ///
    /// Missing parent directories of the original location are recreated.
    /// The sidecar is deleted once the file is back.
    ///
    /// # Errors
    ///
    /// See [`RestoreError`]. An existing file at the original location is
    /// never overwritten.
    pub fn restore(&self, filename: &str) -> Result<RestoredFile, RestoreError> {
        let (quarantined, info) = self.info(filename)?;
        let target = info.original_path.clone();

        if target.symlink_metadata().is_ok() {
            return Err(RestoreError::DestinationExists(target));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| RestoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if let Err(source) = move_file(&quarantined, &target) {
            log::error!(
                "RESTORE FAILED: {} -> {}: {}",
                quarantined.display(),
                target.display(),
                source
            );
            return Err(RestoreError::Io {
                path: quarantined,
                source,
            });
        }

        let sidecar = sidecar_path(&quarantined);
        if let Err(e) = fs::remove_file(&sidecar) {
            log::warn!("Could not remove {}: {}", sidecar.display(), e);
        }

        log::info!("RESTORED: {} -> {}", quarantined.display(), target.display());
        Ok(RestoredFile {
            from: quarantined,
            to: target,
            info,
        })
    }

    /// Enumerate quarantined files (sidecars excluded).
    #[must_use]
    pub fn list(&self) -> QuarantineListing {
        let files = self
            .quarantined_paths()
            .into_iter()
            .map(|path| {
                let below_root = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
                let mut parts = below_root.components();
                let date = if below_root.components().count() >= 2 {
                    parts
                        .next()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                } else {
                    None
                };
                let relative = parts.as_path().to_path_buf();
                let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                let info = RestoreInfo::read(&sidecar_path(&path)).ok();
                QuarantinedFile {
                    path,
                    date,
                    relative,
                    size,
                    info,
                }
            })
            .collect();
        QuarantineListing { files }
    }

    /// Delete quarantined files older than `days` days.
    ///
    /// `days == 0` disables purging and deletes nothing.
    pub fn purge_older_than(&self, days: u32) -> PurgeSummary {
        if days == 0 {
            log::info!("Purge disabled (delete_after_days = 0)");
            return PurgeSummary::default();
        }
        let age = Duration::from_secs(u64::from(days) * SECONDS_PER_DAY);
        let cutoff = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.purge_before(cutoff)
    }

    /// Delete quarantined files whose modification time is strictly before `cutoff`.
    ///
    /// Each deleted file takes its sidecar with it. Directories left empty
    /// are removed bottom-up; the root itself is kept.
    pub fn purge_before(&self, cutoff: SystemTime) -> PurgeSummary {
        let mut summary = PurgeSummary::default();
        let now = SystemTime::now();

        for path in self.quarantined_paths() {
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified >= cutoff {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    let sidecar = sidecar_path(&path);
                    if sidecar.exists() {
                        if let Err(e) = fs::remove_file(&sidecar) {
                            log::warn!("Could not remove {}: {}", sidecar.display(), e);
                        }
                    }
                    let age_days = now
                        .duration_since(modified)
                        .map(|d| d.as_secs() / SECONDS_PER_DAY)
                        .unwrap_or(0);
                    log::info!("CLEANED: {} (age: {} days)", path.display(), age_days);
                    summary.deleted_files += 1;
                    summary.freed_bytes += metadata.len();
                }
                Err(e) => {
                    log::error!("Error deleting {}: {}", path.display(), e);
                    summary.failures.push((path, e.to_string()));
                }
            }
        }

        summary.removed_dirs = self.prune_empty_dirs();
        summary
    }

    /// Remove empty directories below the root, deepest first.
    fn prune_empty_dirs(&self) -> usize {
        let dirs: Vec<PathBuf> = WalkDir::new(&self.root)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .collect();

        dirs.into_iter()
            .filter(|dir| {
                let empty = fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none());
                empty && fs::remove_dir(dir).is_ok()
            })
            .count()
    }

    /// Every non-sidecar file under the root, sorted by path.
    fn quarantined_paths(&self) -> Vec<PathBuf> {
        if !self.root.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && !is_sidecar(e.path()))
            .map(walkdir::DirEntry::into_path)
            .collect()
    }
}

/// Move a file, falling back to copy-then-delete across filesystems.
///
/// The source is only removed after the destination is completely written.
pub fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(src, dest),
        Err(e) => Err(e),
    }
}

fn copy_then_remove(src: &Path, dest: &Path) -> io::Result<()> {
    let mut partial = dest.as_os_str().to_os_string();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let staged = fs::copy(src, &partial)
        .and_then(|_| OpenOptions::new().write(true).open(&partial))
        .and_then(|f| f.sync_all())
        .and_then(|()| fs::rename(&partial, dest));
    if let Err(e) = staged {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    if let Err(e) = fs::remove_file(src) {
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    Ok(())
}
