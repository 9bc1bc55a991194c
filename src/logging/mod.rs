//! Logging infrastructure for DupeGuard.
//!
//! This module provides logging through the `log` facade with an `env_logger`
//! backend that writes to a size-rotated log file. Log levels are determined
//! by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. The `log_level` configuration key
//!
//! Every line has the form `YYYY-MM-DD HH:MM:SS | LEVEL    | message`. When
//! the effective level is DEBUG or finer, lines are echoed to stderr too.
//!
//! # Example
//!
//! ```rust,no_run
//! use dupeguard::logging::{init_logging, LogOptions};
//! use log::LevelFilter;
//!
//! let options = LogOptions::new("/tmp/dupeguard.log", LevelFilter::Info);
//! init_logging(&options);
//! log::info!("Monitoring started");
//! ```

pub mod rotate;
pub mod view;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use env_logger::{Builder, Target, WriteStyle};
use log::{Level, LevelFilter};

pub use rotate::RotatingFile;
pub use view::{clear, export, follow, read_lines, LogFilter};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Log file path
    pub file: PathBuf,
    /// Maximum level written
    pub level: LevelFilter,
    /// Rotate after this many bytes (0 = never)
    pub max_bytes: u64,
    /// Rotated files kept
    pub backups: u32,
}

impl LogOptions {
    /// Options with the default 10 MB / 5 backups rotation.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, level: LevelFilter) -> Self {
        Self {
            file: file.into(),
            level,
            max_bytes: 10 * BYTES_PER_MB,
            backups: 5,
        }
    }

    /// Set the rotation limits, with the size in megabytes.
    #[must_use]
    pub fn with_rotation(mut self, max_mb: u64, backups: u32) -> Self {
        self.max_bytes = max_mb.saturating_mul(BYTES_PER_MB);
        self.backups = backups;
        self
    }
}

/// Writes to the log file and, optionally, to stderr.
struct LogSink {
    file: Option<RotatingFile>,
    echo: bool,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        if self.echo {
            io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        if self.echo {
            io::stderr().flush()?;
        }
        Ok(())
    }
}

/// Initialize the logging subsystem.
///
/// Should be called once at startup. Calling it again is harmless; the
/// first logger stays installed. If the log file cannot be opened, logging
/// falls back to stderr.
pub fn init_logging(options: &LogOptions) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(options.level);
    }

    let effective = if use_env {
        LevelFilter::Trace
    } else {
        options.level
    };
    let file = match RotatingFile::open(&options.file, options.max_bytes, options.backups) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!(
                "Cannot open log file {}: {} (logging to stderr)",
                options.file.display(),
                e
            );
            None
        }
    };
    let echo = file.is_none() || effective >= LevelFilter::Debug;

    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} | {:<8} | {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                level_label(record.level()),
                record.args()
            )
        })
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(LogSink { file, echo })));

    if builder.try_init().is_ok() {
        log::debug!(
            "Logging initialized at level {:?} to {}",
            options.level,
            options.file.display()
        );
    }
}

/// Determine the log level from CLI flags and the configured level.
///
/// # Arguments
///
/// * `verbose` - Verbosity count (0 = configured level, 1 = debug, 2+ = trace)
/// * `quiet` - If true, use error level
/// * `configured` - Level from the config file
#[must_use]
pub fn determine_level(verbose: u8, quiet: bool, configured: LevelFilter) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => configured,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Level name as written in the log file (`WARNING`, not `WARN`).
#[must_use]
pub fn level_label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}
