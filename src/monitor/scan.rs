//! One-shot scan for duplicates that already exist.
//!
//! Walks each folder's full subtree in sorted order. A file qualifies when
//! it has a `-<digits>` suffix and its base-name file exists in the same
//! directory; the configured pattern list is not consulted. Qualifying
//! files go through the same [`DuplicateHandler`] path as monitor events.
//!
//! The scan takes no instance lock. Running it while a monitor is active
//! may race on the same files; moves are plain renames, so the loser of
//! such a race just sees the file as vanished.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::handler::{DuplicateHandler, HandleOutcome};
use crate::detection::{base_name, has_numeric_suffix};
use crate::signal::ShutdownHandler;

/// Tally of a one-shot scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Regular files visited
    pub files_seen: usize,
    /// Files with a numeric suffix and an existing base file
    pub candidates: usize,
    /// Duplicates moved to quarantine
    pub quarantined: usize,
    /// Duplicates left in place because of dry run
    pub dry_run: usize,
    /// Candidates that matched no original
    pub unique: usize,
    /// Duplicates that could not be moved
    pub failed: usize,
    /// Whether the scan stopped early on shutdown
    pub interrupted: bool,
}

impl ScanSummary {
    /// Confirmed duplicates, whatever happened to them.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.quarantined + self.dry_run + self.failed
    }
}

/// Files under `folder` that look like duplicates of an existing base file.
///
/// Anything below `skip` (the quarantine root) is ignored.
#[must_use]
pub fn find_candidates(folder: &Path, skip: Option<&Path>) -> (usize, Vec<PathBuf>) {
    let mut seen = 0;
    let mut candidates = Vec::new();

    let entries = WalkDir::new(folder)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| skip.map_or(true, |s| !e.path().starts_with(s)))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Error walking {}: {}", folder.display(), e);
                None
            }
        });

    for entry in entries {
        if !entry.file_type().is_file() {
            continue;
        }
        seen += 1;
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !has_numeric_suffix(name) {
            continue;
        }
        let base = entry.path().with_file_name(base_name(name));
        if base.is_file() {
            candidates.push(entry.into_path());
        }
    }
    (seen, candidates)
}

/// Scan `folders` once and handle every candidate found.
///
/// Missing folders are logged and skipped. If `shutdown` is requested the
/// scan stops before the next file.
pub fn scan_folders(
    folders: &[PathBuf],
    handler: &DuplicateHandler,
    shutdown: Option<&ShutdownHandler>,
) -> ScanSummary {
    let mut summary = ScanSummary::default();
    let skip = handler.quarantine().root().to_path_buf();

    for folder in folders {
        if !folder.is_dir() {
            log::warn!("Scan folder does not exist, skipping: {}", folder.display());
            continue;
        }
        log::info!("Scanning for existing duplicates in: {}", folder.display());

        let (seen, candidates) = find_candidates(folder, Some(&skip));
        summary.files_seen += seen;
        log::debug!(
            "{} of {} files in {} are candidates",
            candidates.len(),
            seen,
            folder.display()
        );

        for path in candidates {
            if shutdown.is_some_and(ShutdownHandler::is_shutdown_requested) {
                log::info!("Scan interrupted");
                summary.interrupted = true;
                return summary;
            }
            summary.candidates += 1;
            match handler.handle_candidate(&path) {
                HandleOutcome::Quarantined { .. } => summary.quarantined += 1,
                HandleOutcome::DryRun { .. } => summary.dry_run += 1,
                HandleOutcome::Failed(_) => summary.failed += 1,
                HandleOutcome::NoDuplicate => summary.unique += 1,
                HandleOutcome::Vanished | HandleOutcome::Skipped => {}
            }
        }
    }

    log::info!(
        "Scan complete: {} files, {} candidates, {} duplicates",
        summary.files_seen,
        summary.candidates,
        summary.duplicates()
    );
    summary
}
