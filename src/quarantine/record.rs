//! Sidecar restoration records.
//!
//! Every quarantined file gets a plain-text companion named
//! `<file>.restore_info`:
//!
//! ```text
//! Original path: /home/me/Dropbox/invoices/invoice-1.pdf
//! Quarantined: 2024-05-01 14:03:22
//! Reason: Duplicate of invoice.pdf
//! Size: 2048 bytes
//! ```
//!
//! Restore only relies on the first line's `Original path: ` prefix; the
//! other fields are parsed leniently.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Extension appended to a quarantined file's name for its sidecar.
pub const SIDECAR_EXTENSION: &str = "restore_info";

const ORIGINAL_PREFIX: &str = "Original path: ";
const QUARANTINED_PREFIX: &str = "Quarantined: ";
const REASON_PREFIX: &str = "Reason: ";
const SIZE_PREFIX: &str = "Size: ";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Metadata needed to put a quarantined file back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreInfo {
    /// Absolute path the file was moved away from
    pub original_path: PathBuf,
    /// When the file was quarantined (local time)
    pub quarantined_at: Option<NaiveDateTime>,
    /// Why the file was quarantined
    pub reason: String,
    /// File size in bytes at quarantine time
    pub size: Option<u64>,
}

/// Errors reading a sidecar record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The record could not be read.
    #[error("cannot read restore info {path}: {source}")]
    Io {
        /// Sidecar path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The first line does not carry the original path.
    #[error("restore info {0} has no original path")]
    MissingOriginalPath(PathBuf),
}

impl RestoreInfo {
    /// Create a record stamped with the current local time.
    #[must_use]
    pub fn new(original_path: PathBuf, reason: impl Into<String>, size: u64) -> Self {
        Self {
            original_path,
            quarantined_at: Some(chrono::Local::now().naive_local()),
            reason: reason.into(),
            size: Some(size),
        }
    }

    /// Render the four-line text form.
    #[must_use]
    pub fn to_text(&self) -> String {
        let stamp = self
            .quarantined_at
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
        format!(
            "{ORIGINAL_PREFIX}{}\n{QUARANTINED_PREFIX}{}\n{REASON_PREFIX}{}\n{SIZE_PREFIX}{} bytes\n",
            self.original_path.display(),
            stamp,
            self.reason,
            self.size.unwrap_or(0)
        )
    }

    /// Parse the text form.
    ///
    /// Returns `None` when the first line lacks the original-path prefix.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines();
        let original = lines.next()?.strip_prefix(ORIGINAL_PREFIX)?.trim();
        if original.is_empty() {
            return None;
        }

        let mut info = Self {
            original_path: PathBuf::from(original),
            quarantined_at: None,
            reason: String::new(),
            size: None,
        };
        for line in lines {
            if let Some(stamp) = line.strip_prefix(QUARANTINED_PREFIX) {
                info.quarantined_at =
                    NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT).ok();
            } else if let Some(reason) = line.strip_prefix(REASON_PREFIX) {
                info.reason = reason.trim().to_string();
            } else if let Some(size) = line.strip_prefix(SIZE_PREFIX) {
                info.size = size.trim().trim_end_matches("bytes").trim().parse().ok();
            }
        }
        Some(info)
    }

    /// Read and parse a sidecar file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the file cannot be read or is malformed.
    pub fn read(sidecar: &Path) -> Result<Self, RecordError> {
        let text = fs::read_to_string(sidecar).map_err(|source| RecordError::Io {
            path: sidecar.to_path_buf(),
            source,
        })?;
        Self::parse(&text).ok_or_else(|| RecordError::MissingOriginalPath(sidecar.to_path_buf()))
    }

    /// Write the record to `sidecar`.
    ///
    /// # Errors
    ///
    /// Propagates the write error.
    pub fn write(&self, sidecar: &Path) -> io::Result<()> {
        fs::write(sidecar, self.to_text())
    }
}

/// Sidecar path for a quarantined file: the same path plus `.restore_info`.
#[must_use]
pub fn sidecar_path(quarantined: &Path) -> PathBuf {
    let mut name = quarantined.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Whether `path` is a sidecar record.
#[must_use]
pub fn is_sidecar(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SIDECAR_EXTENSION)
}
