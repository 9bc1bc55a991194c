//! Command-line interface definitions for DupeGuard.
//!
//! This module defines all CLI arguments, subcommands, and options using the
//! clap derive API. Global flags mirror the classic `-d/-c/-s/-l` switches;
//! everything else is a subcommand.
//!
//! # Example
//!
//! ```bash
//! # Start monitoring the configured folders
//! dupeguard watch
//!
//! # Same, but only log what would be quarantined
//! dupeguard --dry-run --start
//!
//! # Clean up duplicates that already exist
//! dupeguard scan ~/Dropbox/Attachments
//!
//! # Put a file back
//! dupeguard restore invoice-1.pdf
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Watches folders and quarantines auto-numbered duplicate files.
///
/// Files named like `report-1.pdf` that match an existing `report.pdf`
/// (by size, creation time and/or content hash) are moved to a dated
/// quarantine folder with enough metadata to restore them later.
#[derive(Debug, Parser)]
#[command(name = "dupeguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Detect and log, but never move files (this run only)
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Use an alternate config file (log and lock files move next to it)
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Start monitoring immediately
    #[arg(short = 's', long, conflicts_with = "show_log")]
    pub start: bool,

    /// Follow the log file until Ctrl+C
    #[arg(short = 'l', long)]
    pub show_log: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for DupeGuard.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Monitor the watched folders until Ctrl+C
    Watch,
    /// Quarantine duplicates that already exist
    Scan(ScanArgs),
    /// List quarantined files grouped by date
    List(ListArgs),
    /// Show the restore information of a quarantined file
    Info(FileArgs),
    /// Move a quarantined file back to its original location
    Restore(FileArgs),
    /// Delete quarantined files older than the retention period
    Purge(PurgeArgs),
    /// Show the log file
    Log(LogArgs),
    /// Manage watched folders
    #[command(subcommand)]
    Folders(FolderCommand),
    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Folders to scan (default: the watched folders)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

/// Arguments for the list subcommand.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// A quarantined file, by name.
#[derive(Debug, Args)]
pub struct FileArgs {
    /// File name as shown by `list`
    #[arg(value_name = "FILENAME")]
    pub filename: String,
}

/// Arguments for the purge subcommand.
#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Override `delete_after_days` (0 deletes nothing)
    #[arg(long, value_name = "N")]
    pub days: Option<u32>,
}

/// Arguments for the log subcommand.
#[derive(Debug, Args)]
pub struct LogArgs {
    /// Number of lines to show (0 = all)
    #[arg(short = 'n', long, default_value = "50")]
    pub lines: usize,

    /// Only errors, warnings and failures
    #[arg(long, conflicts_with_all = ["debug", "search"])]
    pub problems: bool,

    /// Only debug lines
    #[arg(long, conflicts_with = "search")]
    pub debug: bool,

    /// Only lines containing TEXT (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Keep printing new lines until Ctrl+C
    #[arg(short, long)]
    pub follow: bool,

    /// Copy the log to PATH (default: a timestamped file in the current directory)
    #[arg(long, value_name = "PATH", num_args = 0..=1, conflicts_with_all = ["follow", "clear"])]
    pub export: Option<Option<PathBuf>>,

    /// Back the log up to `<log>.backup` and empty it
    #[arg(long, conflicts_with = "follow")]
    pub clear: bool,
}

/// Watched folder management.
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// List watched folders
    List,
    /// Add a folder
    Add {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Remove a folder
    Remove {
        #[arg(value_name = "PATH")]
        path: String,
    },
}

/// Settings management.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print every setting
    Show,
    /// Print one setting
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Change one setting and save
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE", allow_hyphen_values = true)]
        value: String,
    },
    /// Print the config file location
    Path,
}
