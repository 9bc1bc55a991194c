//! The duplicate-handling path.
//!
//! Both the event-driven monitor and the one-shot scan end up here:
//! gather originals, classify against each in order, quarantine on the
//! first match. Per-file errors are logged and returned as a
//! [`HandleOutcome`]; they never propagate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};

use super::stats::SessionStats;
use crate::config::Config;
use crate::detection::{
    classify, gather_originals, DetectionSettings, FileFacts, PatternMatcher,
};
use crate::quarantine::{QuarantineError, QuarantineManager, QuarantineOutcome, QuarantineRecord};

/// What happened to one observed file.
#[derive(Debug)]
pub enum HandleOutcome {
    /// Not a candidate (directory, name did not match, or inside quarantine).
    Skipped,
    /// The file disappeared before it could be examined.
    Vanished,
    /// No original matched; the file stays where it is.
    NoDuplicate,
    /// Duplicate moved into quarantine.
    Quarantined {
        /// The completed move
        record: QuarantineRecord,
        /// Checks that passed, e.g. `size matches (2048 bytes); time within 10.0s`
        trail: String,
    },
    /// Duplicate found, but dry run left it in place.
    DryRun {
        /// The original it duplicates
        original: PathBuf,
        /// Checks that passed
        trail: String,
    },
    /// Duplicate found, but moving it failed; the file stays in place.
    Failed(QuarantineError),
}

impl HandleOutcome {
    /// Whether a duplicate was confirmed, regardless of what happened next.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::Quarantined { .. } | Self::DryRun { .. } | Self::Failed(_)
        )
    }
}

/// Runs detection and quarantine for individual files.
#[derive(Debug, Clone)]
pub struct DuplicateHandler {
    matcher: PatternMatcher,
    settings: DetectionSettings,
    quarantine: QuarantineManager,
    stats: Arc<SessionStats>,
}

impl DuplicateHandler {
    /// Create a handler with fresh statistics.
    #[must_use]
    pub fn new(
        matcher: PatternMatcher,
        settings: DetectionSettings,
        quarantine: QuarantineManager,
    ) -> Self {
        Self {
            matcher,
            settings,
            quarantine,
            stats: Arc::new(SessionStats::new()),
        }
    }

    /// Build a handler from the application config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PatternMatcher::new(&config.file_patterns),
            DetectionSettings::from_config(config),
            QuarantineManager::from_config(config),
        )
    }

    /// Replace the statistics the handler records into.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<SessionStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Statistics recorded so far.
    #[must_use]
    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    /// Detection settings in use.
    #[must_use]
    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Quarantine manager in use.
    #[must_use]
    pub fn quarantine(&self) -> &QuarantineManager {
        &self.quarantine
    }

    /// React to a file-creation event.
    ///
    /// Directories, files inside the quarantine tree and names the pattern
    /// matcher rejects are skipped.
    pub fn on_created(&self, path: &Path, is_dir: bool) -> HandleOutcome {
        if is_dir || path.starts_with(self.quarantine.root()) {
            return HandleOutcome::Skipped;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return HandleOutcome::Skipped;
        };
        if !self.matcher.is_candidate(name) {
            return HandleOutcome::Skipped;
        }
        self.handle_candidate(path)
    }

    /// Count `path` as checked and run the duplicate-handling path on it.
    pub fn handle_candidate(&self, path: &Path) -> HandleOutcome {
        self.stats.record_checked();
        log::info!("Potential duplicate detected: {}", path.display());
        self.process(path)
    }

    /// Compare `path` against its originals and quarantine it on the first match.
    pub fn process(&self, path: &Path) -> HandleOutcome {
        let facts = match FileFacts::probe(path) {
            Ok(facts) => facts,
            Err(e) => {
                log::info!("Skipping {}: {}", path.display(), e);
                return HandleOutcome::Vanished;
            }
        };
        let filename = display_name(path);
        let created: DateTime<Local> = facts.created.into();
        log::info!(
            "Analyzing: {} (Size: {} bytes, Created: {})",
            filename,
            facts.size,
            created.format("%Y-%m-%d %H:%M:%S")
        );

        for original in gather_originals(path) {
            let original_name = display_name(&original);
            log::debug!("Comparing with: {}", original_name);

            let verdict = classify(&facts, &original, &self.settings);
            if verdict.is_duplicate {
                log::info!(
                    "DUPLICATE CONFIRMED: {} is duplicate of {} ({})",
                    filename,
                    original_name,
                    verdict.reason
                );
                self.stats.record_duplicate();
                return self.quarantine_duplicate(path, original, &original_name, verdict.reason);
            }
            log::debug!("Not a duplicate of {}: {}", original_name, verdict.reason);
        }

        log::info!("NO DUPLICATE FOUND: {} appears to be unique", filename);
        HandleOutcome::NoDuplicate
    }

    fn quarantine_duplicate(
        &self,
        path: &Path,
        original: PathBuf,
        original_name: &str,
        trail: String,
    ) -> HandleOutcome {
        let reason = format!("Duplicate of {original_name}");
        match self.quarantine.quarantine(path, &reason) {
            Ok(QuarantineOutcome::Moved(record)) => {
                self.stats.record_quarantined();
                HandleOutcome::Quarantined { record, trail }
            }
            Ok(QuarantineOutcome::DryRun { .. }) => HandleOutcome::DryRun { original, trail },
            Err(e) => {
                match &e {
                    QuarantineError::PermissionDenied(_) => {
                        log::error!("FAILED - Permission denied: {}", path.display());
                    }
                    other => {
                        log::error!("FAILED - Error moving {}: {}", path.display(), other);
                    }
                }
                self.stats.record_failure();
                HandleOutcome::Failed(e)
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
