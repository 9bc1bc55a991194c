//! Console reports for the CLI commands.
//!
//! Every function writes to a caller-supplied [`Write`] so commands print to
//! stdout while tests capture into a buffer. Colors come from `yansi` and
//! are switched off globally when stdout is not a terminal or `--no-color`
//! is given.
//!
//! `list --json` uses the serializable [`JsonListing`] view instead of the
//! in-memory listing types.

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use serde::Serialize;
use yansi::Paint;

use crate::config::{AppPaths, Config, KEYS};
use crate::detection::DetectionSettings;
use crate::monitor::{ScanSummary, StatsSnapshot};
use crate::quarantine::{PurgeSummary, QuarantineListing, RestoreInfo, RestoredFile};

/// Format bytes as a human-readable size (e.g. `1.5 KiB`).
#[must_use]
pub fn format_size(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

/// Turn colors on or off for the whole process.
pub fn configure_colors(no_color: bool) {
    if no_color {
        yansi::disable();
    } else {
        yansi::whenever(yansi::Condition::TTY_AND_COLOR);
    }
}

fn on_off(enabled: bool) -> String {
    if enabled {
        "ON".green().to_string()
    } else {
        "OFF".dim().to_string()
    }
}

/// Status summary shown when no command is given.
///
/// `monitor_pid` is the owner of a live instance lock, if any.
pub fn write_status<W: Write>(
    w: &mut W,
    config: &Config,
    paths: &AppPaths,
    listing: &QuarantineListing,
    monitor_pid: Option<u32>,
) -> io::Result<()> {
    writeln!(w, "{}", "DupeGuard status".bold())?;
    match monitor_pid {
        Some(pid) => writeln!(w, "  Monitor:        {} (pid {})", "running".green(), pid)?,
        None => writeln!(w, "  Monitor:        {}", "stopped".yellow())?,
    }
    writeln!(w, "  Config file:    {}", paths.config_file.display())?;
    writeln!(w, "  Log file:       {}", paths.log_file_for(config).display())?;

    writeln!(w)?;
    if config.watched_folders.is_empty() {
        writeln!(
            w,
            "  Watched folders: {} (add one with `dupeguard folders add <PATH>`)",
            "none".red()
        )?;
    } else {
        writeln!(w, "  Watched folders:")?;
        for folder in &config.watched_folders {
            write_folder_line(w, folder)?;
        }
    }

    writeln!(w)?;
    writeln!(
        w,
        "  Detection:      {}",
        DetectionSettings::from_config(config).summary()
    )?;
    writeln!(w, "  Dry run:        {}", on_off(config.dry_run))?;
    writeln!(w, "  Quarantine:     {}", config.quarantine_path.display())?;
    writeln!(
        w,
        "  Quarantined:    {} files ({})",
        listing.len(),
        format_size(listing.total_size())
    )?;
    if config.delete_after_days == 0 {
        writeln!(w, "  Auto-delete:    {}", "never".dim())?;
    } else {
        writeln!(
            w,
            "  Auto-delete:    after {} days",
            config.delete_after_days
        )?;
    }
    Ok(())
}

fn write_folder_line<W: Write>(w: &mut W, folder: &Path) -> io::Result<()> {
    if folder.is_dir() {
        writeln!(w, "    {} {}", "✓".green(), folder.display())
    } else {
        writeln!(w, "    {} {} (missing)", "✗".red(), folder.display())
    }
}

/// `folders list`.
pub fn write_folders<W: Write>(w: &mut W, config: &Config) -> io::Result<()> {
    if config.watched_folders.is_empty() {
        return writeln!(w, "No watched folders configured.");
    }
    for folder in &config.watched_folders {
        write_folder_line(w, folder)?;
    }
    Ok(())
}

/// `config show`: one `key = value` line per setting.
pub fn write_config<W: Write>(w: &mut W, config: &Config) -> io::Result<()> {
    for key in KEYS {
        // KEYS only holds keys that `get` accepts.
        let value = config.get(key).unwrap_or_default();
        writeln!(w, "{:<18} = {}", key.cyan(), value)?;
    }
    Ok(())
}

/// Quarantine listing grouped by date folder, newest first.
pub fn write_listing<W: Write>(w: &mut W, root: &Path, listing: &QuarantineListing) -> io::Result<()> {
    if listing.is_empty() {
        return writeln!(w, "Quarantine is empty ({}).", root.display());
    }

    for (date, files) in listing.by_date() {
        let size: u64 = files.iter().map(|f| f.size).sum();
        writeln!(
            w,
            "{} ({} files, {})",
            date.bold(),
            files.len(),
            format_size(size)
        )?;
        for file in files {
            write!(w, "  {:<40} {:>10}", file.relative.display(), format_size(file.size))?;
            match &file.info {
                Some(info) => writeln!(w, "  <- {}", info.original_path.display())?,
                None => writeln!(w, "  {}", "(no restore info)".yellow())?,
            }
        }
    }
    writeln!(w)?;
    writeln!(
        w,
        "Total: {} files, {}",
        listing.len(),
        format_size(listing.total_size())
    )
}

/// One quarantined file in `list --json`.
#[derive(Debug, Clone, Serialize)]
pub struct JsonQuarantinedFile {
    /// Full path inside quarantine
    pub path: String,
    /// Date folder (`YYYY-MM-DD`)
    pub date: Option<String>,
    /// Size in bytes
    pub size: u64,
    /// Where the file came from, if its record is readable
    pub original_path: Option<String>,
    /// Quarantine timestamp (`YYYY-MM-DD HH:MM:SS`)
    pub quarantined_at: Option<String>,
    /// Why it was quarantined
    pub reason: Option<String>,
}

/// `list --json` document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonListing {
    pub root: String,
    pub total_files: usize,
    pub total_size: u64,
    pub files: Vec<JsonQuarantinedFile>,
}

impl JsonListing {
    /// Build the JSON view of a listing.
    #[must_use]
    pub fn new(root: &Path, listing: &QuarantineListing) -> Self {
        let files = listing
            .files
            .iter()
            .map(|f| JsonQuarantinedFile {
                path: f.path.display().to_string(),
                date: f.date.clone(),
                size: f.size,
                original_path: f
                    .info
                    .as_ref()
                    .map(|i| i.original_path.display().to_string()),
                quarantined_at: f
                    .info
                    .as_ref()
                    .and_then(|i| i.quarantined_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                reason: f.info.as_ref().map(|i| i.reason.clone()),
            })
            .collect();
        Self {
            root: root.display().to_string(),
            total_files: listing.len(),
            total_size: listing.total_size(),
            files,
        }
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde_json error, which cannot happen for this type in practice.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `info`: the restore record of one quarantined file.
pub fn write_info<W: Write>(w: &mut W, path: &Path, info: &RestoreInfo) -> io::Result<()> {
    writeln!(w, "{}", path.display().bold())?;
    writeln!(w, "  Original path: {}", info.original_path.display())?;
    match info.quarantined_at {
        Some(at) => writeln!(w, "  Quarantined:   {}", at.format("%Y-%m-%d %H:%M:%S"))?,
        None => writeln!(w, "  Quarantined:   unknown")?,
    }
    writeln!(w, "  Reason:        {}", info.reason)?;
    match info.size {
        Some(size) => writeln!(w, "  Size:          {} ({} bytes)", format_size(size), size)?,
        None => writeln!(w, "  Size:          unknown")?,
    }
    if info.original_path.exists() {
        writeln!(
            w,
            "  {}",
            "A file already exists at the original path; restore will refuse.".yellow()
        )?;
    }
    Ok(())
}

/// `restore`: confirmation line.
pub fn write_restored<W: Write>(w: &mut W, restored: &RestoredFile) -> io::Result<()> {
    writeln!(
        w,
        "{} {} -> {}",
        "Restored".green(),
        restored.from.display(),
        restored.to.display()
    )
}

/// End-of-session statistics for `watch`.
pub fn write_stats<W: Write>(w: &mut W, stats: &StatsSnapshot) -> io::Result<()> {
    writeln!(w, "{}", "Session statistics".bold())?;
    writeln!(
        w,
        "  Started:          {}",
        stats.started_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(w, "  Uptime:           {}", stats.uptime_display())?;
    writeln!(w, "  Files checked:    {}", stats.files_checked)?;
    writeln!(w, "  Duplicates found: {}", stats.duplicates_found)?;
    writeln!(w, "  Quarantined:      {}", stats.quarantined)?;
    if stats.failures > 0 {
        writeln!(w, "  Failures:         {}", stats.failures.red())?;
    }
    writeln!(w, "  Success rate:     {:.1}%", stats.success_rate())
}

/// `purge` result.
pub fn write_purge<W: Write>(w: &mut W, days: u32, summary: &PurgeSummary) -> io::Result<()> {
    if days == 0 {
        return writeln!(w, "Auto-delete is disabled (delete_after_days = 0); nothing purged.");
    }
    writeln!(
        w,
        "Purged {} files older than {} days, freed {} ({} empty folders removed).",
        summary.deleted_files,
        days,
        format_size(summary.freed_bytes),
        summary.removed_dirs
    )?;
    for (path, reason) in &summary.failures {
        writeln!(w, "  {} {}: {}", "FAILED".red(), path.display(), reason)?;
    }
    Ok(())
}

/// `scan` result.
pub fn write_scan<W: Write>(w: &mut W, summary: &ScanSummary) -> io::Result<()> {
    writeln!(
        w,
        "Scanned {} files, {} candidates, {} duplicates.",
        summary.files_seen,
        summary.candidates,
        summary.duplicates()
    )?;
    if summary.quarantined > 0 {
        writeln!(w, "  Quarantined: {}", summary.quarantined.green())?;
    }
    if summary.dry_run > 0 {
        writeln!(w, "  Would quarantine (dry run): {}", summary.dry_run.yellow())?;
    }
    if summary.unique > 0 {
        writeln!(w, "  Not duplicates: {}", summary.unique)?;
    }
    if summary.failed > 0 {
        writeln!(w, "  Failed: {}", summary.failed.red())?;
    }
    if summary.interrupted {
        writeln!(w, "  {}", "Scan was interrupted.".yellow())?;
    }
    Ok(())
}
