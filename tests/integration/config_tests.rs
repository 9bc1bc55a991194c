use dupeguard::config::{AppPaths, Config, ConfigError, LogLevel};
use dupeguard::detection::HashAlgorithm;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tempfile::tempdir;

/// Serializes tests that read or write `DUPEGUARD_*` variables.
pub(crate) static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all DUPEGUARD_* environment variables to avoid interference.
pub(crate) fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DUPEGUARD_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_missing_file_gives_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    clear_env();
    let dir = tempdir().unwrap();

    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert!(config.watched_folders.is_empty());
    assert!(config.check_size);
    assert!(!config.check_time);
    assert_eq!(config.time_window, 300);
    assert_eq!(config.hash_algorithm, HashAlgorithm::Sha256);
    assert_eq!(config.delete_after_days, 30);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_toml_file_overrides_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
watched_folders = ["/data/Dropbox/Attachments"]
check_time = true
time_window = 60
use_hash = true
hash_algorithm = "md5"
log_level = "WARNING"
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.watched_folders, vec![PathBuf::from("/data/Dropbox/Attachments")]);
    assert!(config.check_time);
    assert_eq!(config.time_window, 60);
    assert!(config.use_hash);
    assert_eq!(config.hash_algorithm, HashAlgorithm::Md5);
    assert_eq!(config.log_level, LogLevel::Warning);
    // Untouched keys keep their defaults.
    assert_eq!(config.delete_after_days, 30);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "dry_run = false\ndelete_after_days = 7\n").unwrap();

    std::env::set_var("DUPEGUARD_DRY_RUN", "true");
    std::env::set_var("DUPEGUARD_DELETE_AFTER_DAYS", "0");
    let config = Config::load(&path);
    let file_only = Config::load_file(&path);
    clear_env();

    let config = config.unwrap();
    assert!(config.dry_run);
    assert_eq!(config.delete_after_days, 0);

    let file_only = file_only.unwrap();
    assert!(!file_only.dry_run);
    assert_eq!(file_only.delete_after_days, 7);
}

#[test]
fn test_invalid_file_is_a_load_error() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "time_window = \"soon\"\n").unwrap();

    assert!(matches!(Config::load(&path), Err(ConfigError::Load(_))));
}

#[test]
fn test_set_save_and_reload() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.set("time_window", "2h").unwrap();
    config.set("check_time", "yes").unwrap();
    config.set("hash_algorithm", "SHA-512").unwrap();
    config.set("file_patterns", r#"["(.+?)(-\\d+)?(\\.pdf)$"]"#).unwrap();
    assert!(config.add_watched_folder(dir.path().join("w")));
    config.save_to_path(&path).unwrap();

    let reloaded = Config::load_file(&path).unwrap();
    assert_eq!(reloaded.time_window, 7200);
    assert!(reloaded.check_time);
    assert_eq!(reloaded.hash_algorithm, HashAlgorithm::Sha512);
    assert_eq!(reloaded.file_patterns, vec![r"(.+?)(-\d+)?(\.pdf)$".to_string()]);
    assert_eq!(reloaded.watched_folders, vec![dir.path().join("w")]);
    assert_eq!(reloaded.get("time_window").unwrap(), "7200 (2h)");
}

#[test]
fn test_set_rejects_bad_values() {
    let mut config = Config::default();
    assert!(matches!(
        config.set("check_size", "maybe"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.set("hash_algorithm", "crc32"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.set("delete_after_days", "-1"),
        Err(ConfigError::InvalidValue { .. })
    ));

    let err = config.set("use_hsah", "true").unwrap_err();
    assert!(err.to_string().contains("did you mean 'use_hash'?"), "{err}");
}

#[test]
fn test_app_paths_follow_config_override() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("alt.toml");
    let paths = AppPaths::discover(Some(&file)).unwrap();

    assert_eq!(paths.config_file, file);
    assert_eq!(paths.config_dir, dir.path());
    assert_eq!(paths.lock_file, dir.path().join("dupeguard.lock"));

    let mut config = Config::default();
    assert_eq!(paths.log_file_for(&config), dir.path().join("dupeguard.log"));
    config.log_file = Some(dir.path().join("custom.log"));
    assert_eq!(paths.log_file_for(&config), dir.path().join("custom.log"));
}
