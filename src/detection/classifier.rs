//! Multi-criterion duplicate classification.
//!
//! # Overview
//!
//! A candidate is compared against one presumed original. Enabled criteria
//! are evaluated in a fixed order and the first failing one stops the
//! comparison:
//!
//! 1. **Size**: byte sizes must be equal
//! 2. **Time window**: creation timestamps must be within `time_window` seconds
//! 3. **Hash**: whole-file content digests must be equal
//!
//! The [`Verdict`] carries a reason trail. On success it lists every check
//! that ran, in evaluation order; on failure it describes the failing check.
//! With every check disabled the candidate trivially passes.
//!
//! # Example
//!
//! ```no_run
//! use dupeguard::detection::classifier::{classify, DetectionSettings, FileFacts};
//! use std::path::Path;
//!
//! let settings = DetectionSettings::default();
//! let candidate = FileFacts::probe(Path::new("/sync/invoice-1.pdf")).unwrap();
//! let verdict = classify(&candidate, Path::new("/sync/invoice.pdf"), &settings);
//! println!("{}: {}", verdict.is_duplicate, verdict.reason);
//! ```

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::hasher::{files_identical, HashAlgorithm};
use super::window::format_time_window;
use crate::config::Config;

/// The detection criteria a classification uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionSettings {
    /// Require equal byte sizes.
    pub check_size: bool,
    /// Require creation times within `time_window` seconds.
    pub check_time: bool,
    /// Maximum creation-time distance in seconds.
    pub time_window: u64,
    /// Require equal content hashes.
    pub use_hash: bool,
    /// Algorithm used for the content hash.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            check_size: true,
            check_time: false,
            time_window: 300,
            use_hash: false,
            hash_algorithm: HashAlgorithm::Sha256,
        }
    }
}

impl DetectionSettings {
    /// Extract the detection settings from the application config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            check_size: config.check_size,
            check_time: config.check_time,
            time_window: config.time_window,
            use_hash: config.use_hash,
            hash_algorithm: config.hash_algorithm,
        }
    }

    /// Enable or disable the size check.
    #[must_use]
    pub fn with_size(mut self, enabled: bool) -> Self {
        self.check_size = enabled;
        self
    }

    /// Enable the time check with the given window, or disable it with `None`.
    #[must_use]
    pub fn with_time_window(mut self, window: Option<u64>) -> Self {
        self.check_time = window.is_some();
        if let Some(seconds) = window {
            self.time_window = seconds;
        }
        self
    }

    /// Enable the hash check with the given algorithm, or disable it with `None`.
    #[must_use]
    pub fn with_hash(mut self, algorithm: Option<HashAlgorithm>) -> Self {
        self.use_hash = algorithm.is_some();
        if let Some(algorithm) = algorithm {
            self.hash_algorithm = algorithm;
        }
        self
    }

    /// One-line summary such as `Size=ON, Time=ON (5m), Hash=OFF`.
    #[must_use]
    pub fn summary(&self) -> String {
        let size = if self.check_size { "Size=ON" } else { "Size=OFF" };
        let time = if self.check_time {
            format!("Time=ON ({})", format_time_window(self.time_window))
        } else {
            "Time=OFF".to_string()
        };
        let hash = if self.use_hash {
            format!("Hash=ON ({})", self.hash_algorithm)
        } else {
            "Hash=OFF".to_string()
        };
        format!("{size}, {time}, {hash}")
    }
}

/// Size and creation time of a file, captured once.
#[derive(Debug, Clone)]
pub struct FileFacts {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Creation time (approximated on POSIX, see [`creation_time`])
    pub created: SystemTime,
}

impl FileFacts {
    /// Read size and creation time from the filesystem.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file's metadata cannot be read.
    pub fn probe(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            created: creation_time(&metadata),
        })
    }
}

/// Best available creation timestamp for a file.
///
/// Windows records a real creation time. POSIX systems generally do not,
/// so the earlier of change time and modification time stands in for it.
#[must_use]
pub fn creation_time(metadata: &Metadata) -> SystemTime {
    #[cfg(windows)]
    {
        metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        use std::time::Duration;

        let secs_nanos = |secs: i64, nanos: i64| {
            let secs = u64::try_from(secs).unwrap_or(0);
            let nanos = u32::try_from(nanos).unwrap_or(0);
            SystemTime::UNIX_EPOCH + Duration::new(secs, nanos)
        };
        let changed = secs_nanos(metadata.ctime(), metadata.ctime_nsec());
        let modified = secs_nanos(metadata.mtime(), metadata.mtime_nsec());
        changed.min(modified)
    }

    #[cfg(not(any(windows, unix)))]
    {
        metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)
    }
}

/// A detection criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Byte size equality
    Size,
    /// Creation time proximity
    Time,
    /// Content hash equality
    Hash,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size => f.write_str("size"),
            Self::Time => f.write_str("time"),
            Self::Hash => f.write_str("hash"),
        }
    }
}

/// Outcome of comparing a candidate with one original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the candidate is considered a duplicate
    pub is_duplicate: bool,
    /// Human-readable reason trail, `; `-separated
    pub reason: String,
    /// Checks that ran and passed, in evaluation order
    pub passed: Vec<Check>,
}

impl Verdict {
    fn rejected(passed: Vec<Check>, reason: String) -> Self {
        Self {
            is_duplicate: false,
            reason,
            passed,
        }
    }
}

/// Classify `candidate` against the file at `original`.
///
/// Never fails: an original that vanished or cannot be read simply yields
/// a non-duplicate verdict with the cause in the reason.
#[must_use]
pub fn classify(candidate: &FileFacts, original: &Path, settings: &DetectionSettings) -> Verdict {
    let original_facts = match FileFacts::probe(original) {
        Ok(facts) => facts,
        Err(e) => {
            return Verdict::rejected(Vec::new(), format!("original unavailable ({e})"));
        }
    };

    let mut passed = Vec::new();
    let mut trail = Vec::new();

    if settings.check_size {
        if candidate.size == original_facts.size {
            passed.push(Check::Size);
            trail.push(format!("size matches ({} bytes)", candidate.size));
        } else {
            return Verdict::rejected(
                passed,
                format!(
                    "size mismatch ({} vs {} bytes)",
                    candidate.size, original_facts.size
                ),
            );
        }
    }

    if settings.check_time {
        let delta = time_delta_secs(candidate.created, original_facts.created);
        if delta <= settings.time_window as f64 {
            passed.push(Check::Time);
            trail.push(format!("time within {delta:.1}s"));
        } else {
            return Verdict::rejected(
                passed,
                format!(
                    "time outside window ({delta:.1}s > {})",
                    format_time_window(settings.time_window)
                ),
            );
        }
    }

    if settings.use_hash {
        let algorithm = settings.hash_algorithm;
        match files_identical(&original_facts.path, &candidate.path, algorithm) {
            Ok(true) => {
                passed.push(Check::Hash);
                trail.push(format!("{algorithm} hash matches"));
            }
            Ok(false) => {
                return Verdict::rejected(passed, format!("{algorithm} hash mismatch"));
            }
            Err(e) => {
                return Verdict::rejected(passed, format!("{algorithm} hash unavailable ({e})"));
            }
        }
    }

    Verdict {
        is_duplicate: true,
        reason: trail.join("; "),
        passed,
    }
}

/// Absolute distance between two timestamps in fractional seconds.
fn time_delta_secs(a: SystemTime, b: SystemTime) -> f64 {
    match a.duration_since(b) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => e.duration().as_secs_f64(),
    }
}
