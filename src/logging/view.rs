//! Reading the log file back for the `log` command, plus export and clear.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use log::Level;

use super::level_label;
use crate::signal::ShutdownHandler;

/// Which log lines to show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogFilter {
    /// Every line
    #[default]
    All,
    /// Errors, warnings and failed operations
    Problems,
    /// Debug lines only
    Debug,
    /// Lines containing the text, case-insensitively
    Search(String),
}

impl LogFilter {
    /// Whether `line` passes the filter.
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Self::All => true,
            Self::Problems => {
                line.contains("| ERROR") || line.contains("| WARNING") || line.contains("FAILED")
            }
            Self::Debug => line.contains("| DEBUG"),
            Self::Search(text) => line.to_lowercase().contains(&text.to_lowercase()),
        }
    }
}

/// The last `limit` lines of `path` that pass `filter`, oldest first.
///
/// `limit == 0` returns every matching line. A missing log file is empty.
///
/// # Errors
///
/// Returns the I/O error if the file exists but cannot be read.
pub fn read_lines(path: &Path, filter: &LogFilter, limit: usize) -> io::Result<Vec<String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut lines: Vec<String> = Vec::new();
    for line in BufReader::new(file).split(b'\n') {
        let line = String::from_utf8_lossy(&line?).trim_end_matches('\r').to_string();
        if filter.matches(&line) {
            lines.push(line);
        }
    }
    if limit > 0 && lines.len() > limit {
        lines.drain(..lines.len() - limit);
    }
    Ok(lines)
}

/// Print lines appended to `path` until shutdown is requested.
///
/// Starts at the current end of the file. When the file shrinks (it was
/// rotated) reading restarts from the beginning of the new file.
///
/// # Errors
///
/// Returns the I/O error from reading the log or writing to `out`.
pub fn follow<W: Write>(
    path: &Path,
    filter: &LogFilter,
    shutdown: &ShutdownHandler,
    out: &mut W,
    poll: Duration,
) -> io::Result<()> {
    let mut pos = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let mut pending = String::new();

    while !shutdown.is_shutdown_requested() {
        let len = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if len < pos {
            pos = 0;
            pending.clear();
        }
        if len > pos {
            let mut file = File::open(path)?;
            file.seek(SeekFrom::Start(pos))?;
            let mut bytes = Vec::new();
            let read = file.take(len - pos).read_to_end(&mut bytes)?;
            pos += read as u64;
            pending.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(idx) = pending.find('\n') {
                let line: String = pending.drain(..=idx).collect();
                if filter.matches(&line) {
                    out.write_all(line.as_bytes())?;
                }
            }
            out.flush()?;
        }
        thread::sleep(poll);
    }
    Ok(())
}

/// Copy the log to `dest`, or to a timestamped file in the current directory.
///
/// A `dest` that is an existing directory receives the timestamped name.
/// Returns `None` when there is no log file yet.
///
/// # Errors
///
/// Returns the I/O error from copying.
pub fn export(log: &Path, dest: Option<&Path>, now: DateTime<Local>) -> io::Result<Option<PathBuf>> {
    if !log.is_file() {
        return Ok(None);
    }
    let name = format!("dupeguard_export_{}.log", now.format("%Y%m%d_%H%M%S"));
    let target = match dest {
        Some(dir) if dir.is_dir() => dir.join(name),
        Some(file) => file.to_path_buf(),
        None => PathBuf::from(name),
    };
    fs::copy(log, &target)?;
    Ok(Some(target))
}

/// Path of the backup written by [`clear`].
#[must_use]
pub fn backup_path(log: &Path) -> PathBuf {
    let mut name = log.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

/// Back the log up to `<log>.backup`, then empty it down to a marker line.
///
/// Returns the backup path, or `None` when there is no log file.
///
/// # Errors
///
/// Returns the I/O error from copying or rewriting. The log is left
/// untouched if the backup could not be made.
pub fn clear(log: &Path, now: DateTime<Local>) -> io::Result<Option<PathBuf>> {
    if !log.is_file() {
        return Ok(None);
    }
    let backup = backup_path(log);
    fs::copy(log, &backup)?;
    fs::write(
        log,
        format!(
            "{} | {:<8} | Log file cleared\n",
            now.format("%Y-%m-%d %H:%M:%S"),
            level_label(Level::Info)
        ),
    )?;
    Ok(Some(backup))
}
