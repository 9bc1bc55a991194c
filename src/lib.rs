//! DupeGuard - Duplicate File Quarantine Monitor
//!
//! Watches cloud-synced folders for auto-numbered copies such as
//! `invoice-1.pdf`, confirms them against the original by size, creation
//! time and/or content hash, and moves confirmed duplicates into a dated
//! quarantine tree from which they can be restored or purged.
//!
//! The library is split into:
//!
//! - [`detection`]: name patterns, candidate originals and the duplicate test
//! - [`quarantine`]: placement, sidecar records, restore and purge
//! - [`monitor`]: the event-driven monitor, one-shot scan and instance lock
//! - [`config`], [`logging`], [`signal`], [`error`]: application plumbing
//! - [`cli`], [`report`]: the command-line front end driven by [`run_app`]

pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod quarantine;
pub mod report;
pub mod signal;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::cli::{Cli, Commands, ConfigCommand, FolderCommand, LogArgs};
use crate::config::{clean_path, AppPaths, Config};
use crate::error::ExitCode;
use crate::logging::{determine_level, init_logging, LogFilter, LogOptions};
use crate::monitor::lock::{is_process_alive, read_pid};
use crate::monitor::{scan_folders, DuplicateHandler, Monitor};
use crate::quarantine::QuarantineManager;

/// How often `log --follow` polls the log file.
const FOLLOW_POLL: Duration = Duration::from_millis(250);

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for anything that should end the process with a
/// non-zero exit code; `main` maps it with [`ExitCode::for_error`].
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    report::configure_colors(cli.no_color);

    let paths = AppPaths::discover(cli.config.as_deref())?;
    let config = Config::load(&paths.config_file)
        .with_context(|| format!("cannot load {}", paths.config_file.display()))?;

    let level = determine_level(cli.verbose, cli.quiet, config.log_level.to_level_filter());
    init_logging(
        &LogOptions::new(paths.log_file_for(&config), level)
            .with_rotation(config.log_max_size, config.log_backup_count),
    );
    log::debug!("Using config file {}", paths.config_file.display());

    // --dry-run applies to this process only and is never saved.
    let mut session = config;
    if cli.dry_run {
        session.dry_run = true;
    }

    let command = match cli.command {
        Some(command) => command,
        None if cli.start => Commands::Watch,
        None if cli.show_log => Commands::Log(LogArgs {
            lines: 20,
            problems: false,
            debug: false,
            search: None,
            follow: true,
            export: None,
            clear: false,
        }),
        None => {
            show_status(&session, &paths)?;
            return Ok(ExitCode::Success);
        }
    };

    let mut out = io::stdout().lock();
    match command {
        Commands::Watch => watch(&session, &paths, &mut out),
        Commands::Scan(args) => {
            let folders = if args.paths.is_empty() {
                session.watched_folders.clone()
            } else {
                args.paths
                    .iter()
                    .map(|p| clean_path(&p.to_string_lossy()))
                    .collect()
            };
            if folders.is_empty() {
                bail!("no folders to scan; pass a path or add a watched folder");
            }
            let shutdown = signal::install_handler()?;
            let handler = DuplicateHandler::from_config(&session);
            let summary = scan_folders(&folders, &handler, Some(&shutdown));
            report::write_scan(&mut out, &summary)?;
            Ok(if summary.interrupted {
                ExitCode::Interrupted
            } else {
                ExitCode::Success
            })
        }
        Commands::List(args) => {
            let manager = QuarantineManager::from_config(&session);
            let listing = manager.list();
            if args.json {
                let json = report::JsonListing::new(manager.root(), &listing).to_json_pretty()?;
                writeln!(out, "{json}")?;
            } else {
                report::write_listing(&mut out, manager.root(), &listing)?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Info(args) => {
            let manager = QuarantineManager::from_config(&session);
            let (path, info) = manager.info(&args.filename)?;
            report::write_info(&mut out, &path, &info)?;
            Ok(ExitCode::Success)
        }
        Commands::Restore(args) => {
            let manager = QuarantineManager::from_config(&session);
            let restored = manager
                .restore(&args.filename)
                .with_context(|| format!("cannot restore {}", args.filename))?;
            report::write_restored(&mut out, &restored)?;
            Ok(ExitCode::Success)
        }
        Commands::Purge(args) => {
            let days = args.days.unwrap_or(session.delete_after_days);
            let manager = QuarantineManager::from_config(&session);
            let summary = manager.purge_older_than(days);
            report::write_purge(&mut out, days, &summary)?;
            Ok(ExitCode::Success)
        }
        Commands::Log(args) => show_log(&session, &paths, &args, &mut out),
        Commands::Folders(command) => folders(command, &session, &paths, &mut out),
        Commands::Config(command) => configure(command, &session, &paths, &mut out),
    }
}

fn show_status(config: &Config, paths: &AppPaths) -> anyhow::Result<()> {
    let listing = QuarantineManager::from_config(config).list();
    let monitor_pid = read_pid(&paths.lock_file)
        .filter(|&pid| pid != std::process::id() && is_process_alive(pid));
    report::write_status(&mut io::stdout().lock(), config, paths, &listing, monitor_pid)?;
    Ok(())
}

fn watch<W: Write>(config: &Config, paths: &AppPaths, out: &mut W) -> anyhow::Result<ExitCode> {
    let shutdown = signal::install_handler()?;
    let mut monitor = Monitor::from_config(config, paths);
    monitor.start().context("cannot start monitoring")?;

    writeln!(
        out,
        "Monitoring {} folder(s){}. Press Ctrl+C to stop.",
        monitor.active_folders().len(),
        if config.dry_run { " [DRY RUN]" } else { "" }
    )?;
    out.flush()?;

    shutdown.wait();
    monitor.stop();

    if let Some(stats) = monitor.stats() {
        writeln!(out)?;
        report::write_stats(out, &stats)?;
    }
    Ok(ExitCode::Success)
}

fn show_log<W: Write>(
    config: &Config,
    paths: &AppPaths,
    args: &LogArgs,
    out: &mut W,
) -> anyhow::Result<ExitCode> {
    let file = paths.log_file_for(config);

    if args.clear {
        log::info!("Clearing log file {}", file.display());
        match logging::clear(&file, chrono::Local::now())
            .with_context(|| format!("cannot clear {}", file.display()))?
        {
            Some(backup) => {
                writeln!(out, "Backup created: {}", backup.display())?;
                writeln!(out, "Log file cleared")?;
            }
            None => writeln!(out, "No log file to clear")?,
        }
        return Ok(ExitCode::Success);
    }
    if let Some(dest) = &args.export {
        match logging::export(&file, dest.as_deref(), chrono::Local::now())
            .with_context(|| format!("cannot export {}", file.display()))?
        {
            Some(target) => {
                log::info!("Log exported to {}", target.display());
                writeln!(out, "Logs exported to: {}", target.display())?;
            }
            None => writeln!(out, "No log file to export")?,
        }
        return Ok(ExitCode::Success);
    }

    let filter = if args.problems {
        LogFilter::Problems
    } else if args.debug {
        LogFilter::Debug
    } else if let Some(text) = &args.search {
        LogFilter::Search(text.clone())
    } else {
        LogFilter::All
    };

    let lines = logging::read_lines(&file, &filter, args.lines)
        .with_context(|| format!("cannot read {}", file.display()))?;
    if lines.is_empty() && !args.follow {
        writeln!(out, "No matching log entries in {}", file.display())?;
    }
    for line in lines {
        writeln!(out, "{line}")?;
    }

    if args.follow {
        let shutdown = signal::install_handler()?;
        out.flush()?;
        logging::follow(&file, &filter, &shutdown, out, FOLLOW_POLL)?;
    }
    Ok(ExitCode::Success)
}

/// Settings edits start from the file alone so environment overrides are
/// never written back.
fn load_for_edit(paths: &AppPaths) -> anyhow::Result<Config> {
    Config::load_file(&paths.config_file)
        .with_context(|| format!("cannot load {}", paths.config_file.display()))
}

fn save(config: &Config, paths: &AppPaths) -> anyhow::Result<()> {
    config
        .save_to_path(&paths.config_file)
        .with_context(|| format!("cannot save {}", paths.config_file.display()))
}

fn folders<W: Write>(
    command: FolderCommand,
    session: &Config,
    paths: &AppPaths,
    out: &mut W,
) -> anyhow::Result<ExitCode> {
    match command {
        FolderCommand::List => report::write_folders(out, session)?,
        FolderCommand::Add { path } => {
            let folder = clean_path(&path);
            if !folder.is_dir() {
                log::warn!("Adding folder that does not exist yet: {}", folder.display());
            }
            let mut config = load_for_edit(paths)?;
            if config.add_watched_folder(folder.clone()) {
                save(&config, paths)?;
                log::info!("Added watched folder: {}", folder.display());
                writeln!(out, "Added {}", folder.display())?;
            } else {
                writeln!(out, "Already watching {}", folder.display())?;
            }
        }
        FolderCommand::Remove { path } => {
            let folder: PathBuf = clean_path(&path);
            let mut config = load_for_edit(paths)?;
            if !config.remove_watched_folder(&folder) {
                bail!("{} is not a watched folder", folder.display());
            }
            save(&config, paths)?;
            log::info!("Removed watched folder: {}", folder.display());
            writeln!(out, "Removed {}", folder.display())?;
        }
    }
    Ok(ExitCode::Success)
}

fn configure<W: Write>(
    command: ConfigCommand,
    session: &Config,
    paths: &AppPaths,
    out: &mut W,
) -> anyhow::Result<ExitCode> {
    match command {
        ConfigCommand::Show => report::write_config(out, session)?,
        ConfigCommand::Get { key } => writeln!(out, "{}", session.get(&key)?)?,
        ConfigCommand::Set { key, value } => {
            let mut config = load_for_edit(paths)?;
            config.set(&key, &value)?;
            save(&config, paths)?;
            log::info!("Setting changed: {} = {}", key, config.get(&key)?);
            writeln!(out, "{} = {}", key, config.get(&key)?)?;
        }
        ConfigCommand::Path => writeln!(out, "{}", paths.config_file.display())?,
    }
    Ok(ExitCode::Success)
}
