use clap::Parser;
use dupeguard::cli::{Cli, Commands, ConfigCommand, FolderCommand};
use dupeguard::error::ExitCode;
use dupeguard::run_app;
use std::fs;
use std::sync::PoisonError;
use tempfile::tempdir;

use super::config_tests::{clear_env, ENV_MUTEX};

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap();
    let _env = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    clear_env();
    run_app(cli)
}

#[test]
fn test_show_log_flag_parses_without_command() {
    let cli = Cli::try_parse_from(["dupeguard", "-l"]).unwrap();
    assert!(cli.show_log);
    assert!(cli.command.is_none());
}

#[test]
fn test_info_and_restore_take_a_filename() {
    let cli = Cli::try_parse_from(["dupeguard", "info", "invoice-1.pdf"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Info(ref a)) if a.filename == "invoice-1.pdf"));
    assert!(Cli::try_parse_from(["dupeguard", "restore"]).is_err());
}

#[test]
fn test_config_subcommands_parse() {
    let cli = Cli::try_parse_from(["dupeguard", "config", "get", "dry_run"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Config(ConfigCommand::Get { ref key })) if key == "dry_run"));
    let cli = Cli::try_parse_from(["dupeguard", "folders", "remove", "/x"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Folders(FolderCommand::Remove { .. }))));
}

#[test]
fn test_folders_and_config_commands_persist() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let config_arg = config.to_str().unwrap();
    let watched = dir.path().join("w");
    fs::create_dir(&watched).unwrap();
    let watched_arg = watched.to_str().unwrap();

    let code = run(&["dupeguard", "-c", config_arg, "folders", "add", watched_arg]).unwrap();
    assert_eq!(code, ExitCode::Success);
    run(&["dupeguard", "-c", config_arg, "config", "set", "time_window", "10m"]).unwrap();
    // --dry-run is for this run only and must not reach the file.
    run(&["dupeguard", "-c", config_arg, "--dry-run", "config", "set", "check_time", "on"]).unwrap();

    let saved = dupeguard::config::Config::load_file(&config).unwrap();
    assert_eq!(saved.watched_folders, vec![watched.clone()]);
    assert_eq!(saved.time_window, 600);
    assert!(saved.check_time);
    assert!(!saved.dry_run);

    assert!(run(&["dupeguard", "-c", config_arg, "config", "set", "nope", "1"]).is_err());
    assert!(run(&["dupeguard", "-c", config_arg, "folders", "remove", "/not/watched"]).is_err());
    run(&["dupeguard", "-c", config_arg, "folders", "remove", watched_arg]).unwrap();
    let saved = dupeguard::config::Config::load_file(&config).unwrap();
    assert!(saved.watched_folders.is_empty());
}

#[test]
fn test_scan_list_restore_purge_commands() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let config_arg = config.to_str().unwrap();
    let watched = dir.path().join("w");
    let quarantine = dir.path().join("q");
    fs::create_dir(&watched).unwrap();
    fs::write(watched.join("a.txt"), b"same").unwrap();
    fs::write(watched.join("a-1.txt"), b"same").unwrap();
    fs::write(
        &config,
        format!(
            "watched_folders = [{:?}]\nquarantine_path = {:?}\n",
            watched.to_str().unwrap(),
            quarantine.to_str().unwrap()
        ),
    )
    .unwrap();

    assert_eq!(run(&["dupeguard", "-c", config_arg, "--dry-run", "scan"]).unwrap(), ExitCode::Success);
    assert!(watched.join("a-1.txt").exists());

    run(&["dupeguard", "-c", config_arg, "scan"]).unwrap();
    assert!(!watched.join("a-1.txt").exists());

    run(&["dupeguard", "-c", config_arg, "list", "--json"]).unwrap();
    run(&["dupeguard", "-c", config_arg, "info", "a-1.txt"]).unwrap();
    run(&["dupeguard", "-c", config_arg, "restore", "a-1.txt"]).unwrap();
    assert_eq!(fs::read(watched.join("a-1.txt")).unwrap(), b"same");
    assert!(run(&["dupeguard", "-c", config_arg, "restore", "a-1.txt"]).is_err());

    assert_eq!(run(&["dupeguard", "-c", config_arg, "purge", "--days", "0"]).unwrap(), ExitCode::Success);
}

#[test]
fn test_watch_without_folders_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let err = run(&["dupeguard", "-c", config.to_str().unwrap(), "watch"]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{err:#}").contains("no watched folders"));
}

#[test]
fn test_status_and_log_commands_succeed() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let config_arg = config.to_str().unwrap();
    assert_eq!(run(&["dupeguard", "-c", config_arg]).unwrap(), ExitCode::Success);
    assert_eq!(
        run(&["dupeguard", "-c", config_arg, "log", "--problems"]).unwrap(),
        ExitCode::Success
    );
    assert_eq!(run(&["dupeguard", "-c", config_arg, "config", "path"]).unwrap(), ExitCode::Success);
}

#[test]
fn test_log_clear_then_export() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let config_arg = config.to_str().unwrap();
    let log = dir.path().join("dupeguard.log");
    fs::write(&log, "2024-05-01 10:00:00 | INFO     | Monitoring started\n").unwrap();

    assert_eq!(
        run(&["dupeguard", "-c", config_arg, "log", "--clear"]).unwrap(),
        ExitCode::Success
    );
    let backup = fs::read_to_string(dir.path().join("dupeguard.log.backup")).unwrap();
    assert!(backup.contains("Monitoring started"));

    let exported = dir.path().join("exported.log");
    assert_eq!(
        run(&[
            "dupeguard",
            "-c",
            config_arg,
            "log",
            "--export",
            exported.to_str().unwrap()
        ])
        .unwrap(),
        ExitCode::Success
    );
    let copy = fs::read_to_string(&exported).unwrap();
    assert!(copy.contains("Log file cleared"));
    assert!(!copy.contains("Monitoring started"));
}
