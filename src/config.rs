//! Application configuration management.
//!
//! Configuration is layered with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. The TOML config file (`config.toml` in the platform config directory,
//!    or the file given with `--config`)
//! 3. `DUPEGUARD_*` environment variables (e.g. `DUPEGUARD_DRY_RUN=true`)
//!
//! A [`Config`] is loaded once and handed to components by reference.
//! Nothing is written back implicitly; commands that change settings call
//! [`Config::save_to_path`] themselves.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::{ProjectDirs, UserDirs};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::{
    format_time_window, parse_time_window, HashAlgorithm, PatternMatcher, DEFAULT_PATTERN,
};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "DUPEGUARD_";

/// Folder name used for the default quarantine root.
pub const QUARANTINE_DIR_NAME: &str = "Quarantined_Duplicates";

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const KEYS: [&str; 14] = [
    "watched_folders",
    "quarantine_path",
    "check_size",
    "check_time",
    "time_window",
    "use_hash",
    "hash_algorithm",
    "dry_run",
    "delete_after_days",
    "file_patterns",
    "log_file",
    "log_level",
    "log_max_size",
    "log_backup_count",
];

/// Errors loading, saving or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file or environment could not be parsed.
    #[error("invalid configuration: {0}")]
    Load(Box<figment::Error>),

    /// The config could not be serialized to TOML.
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config file could not be written.
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The key is not a configuration key.
    #[error("unknown config key '{key}'{hint}")]
    UnknownKey { key: String, hint: String },

    /// The value cannot be used for the key.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// No home directory could be determined.
    #[error("cannot determine the configuration directory")]
    NoConfigDir,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}

/// Log verbosity as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    #[serde(alias = "WARN")]
    Warning,
    Error,
}

impl LogLevel {
    /// Equivalent `log` filter.
    #[must_use]
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::Debug,
            Self::Info => LevelFilter::Info,
            Self::Warning => LevelFilter::Warn,
            Self::Error => LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            other => Err(format!(
                "unknown log level '{other}' (expected DEBUG, INFO, WARNING or ERROR)"
            )),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories monitored for new files.
    pub watched_folders: Vec<PathBuf>,
    /// Root of the quarantine tree.
    pub quarantine_path: PathBuf,
    /// Require equal sizes.
    pub check_size: bool,
    /// Require creation times within `time_window`.
    pub check_time: bool,
    /// Time window in seconds.
    pub time_window: u64,
    /// Require equal content hashes.
    pub use_hash: bool,
    /// Content hash algorithm.
    pub hash_algorithm: HashAlgorithm,
    /// Log intended moves without performing them.
    pub dry_run: bool,
    /// Purge quarantined files older than this many days (0 = never).
    pub delete_after_days: u32,
    /// Regular expressions a candidate filename must match (any of).
    pub file_patterns: Vec<String>,
    /// Log file; defaults to `dupeguard.log` next to the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Minimum level written to the log file.
    pub log_level: LogLevel,
    /// Rotate the log after this many megabytes.
    pub log_max_size: u64,
    /// Number of rotated log files kept.
    pub log_backup_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watched_folders: Vec::new(),
            quarantine_path: default_quarantine_path(),
            check_size: true,
            check_time: false,
            time_window: 300,
            use_hash: false,
            hash_algorithm: HashAlgorithm::Sha256,
            dry_run: false,
            delete_after_days: 30,
            file_patterns: vec![DEFAULT_PATTERN.to_string()],
            log_file: None,
            log_level: LogLevel::Info,
            log_max_size: 10,
            log_backup_count: 5,
        }
    }
}

impl Config {
    /// Figment with defaults and the given TOML file, without environment overrides.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path))
    }

    /// Load configuration: defaults < `path` < `DUPEGUARD_*` environment.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file or an environment value is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path)
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        log::debug!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from `path` only, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file is invalid.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::figment(path).extract()?)
    }

    /// Write the configuration to `path` as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] or [`ConfigError::Serialize`].
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Render the value of `key` for display.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] for keys outside [`KEYS`].
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "watched_folders" => render_list(self.watched_folders.iter().map(|p| p.display())),
            "quarantine_path" => self.quarantine_path.display().to_string(),
            "check_size" => self.check_size.to_string(),
            "check_time" => self.check_time.to_string(),
            "time_window" => format!(
                "{} ({})",
                self.time_window,
                format_time_window(self.time_window)
            ),
            "use_hash" => self.use_hash.to_string(),
            "hash_algorithm" => self.hash_algorithm.to_string(),
            "dry_run" => self.dry_run.to_string(),
            "delete_after_days" => self.delete_after_days.to_string(),
            "file_patterns" => render_list(self.file_patterns.iter()),
            "log_file" => self
                .log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default)".to_string()),
            "log_level" => self.log_level.to_string(),
            "log_max_size" => format!("{} MB", self.log_max_size),
            "log_backup_count" => self.log_backup_count.to_string(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Parse `value` and assign it to `key`.
    ///
    /// Lists accept a JSON array (`["a", "b"]`) or comma-separated values.
    /// `time_window` accepts `90`, `5m`, `2h`, `3d`, `1w`, `1mo` or `1y`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] or [`ConfigError::InvalidValue`];
    /// the config is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        match key {
            "watched_folders" => {
                self.watched_folders = parse_list(value)
                    .map_err(invalid)?
                    .iter()
                    .map(|s| clean_path(s))
                    .collect();
            }
            "quarantine_path" => self.quarantine_path = clean_path(value),
            "check_size" => self.check_size = parse_bool(value).map_err(invalid)?,
            "check_time" => self.check_time = parse_bool(value).map_err(invalid)?,
            "time_window" => self.time_window = parse_time_window(value).map_err(invalid)?,
            "use_hash" => self.use_hash = parse_bool(value).map_err(invalid)?,
            "hash_algorithm" => {
                self.hash_algorithm = value.parse().map_err(|e: String| invalid(e))?;
            }
            "dry_run" => self.dry_run = parse_bool(value).map_err(invalid)?,
            "delete_after_days" => {
                self.delete_after_days = value
                    .trim()
                    .parse()
                    .map_err(|e| invalid(format!("{e}")))?;
            }
            "file_patterns" => {
                let patterns = parse_list(value).map_err(invalid)?;
                for pattern in &patterns {
                    PatternMatcher::compile(pattern)
                        .map_err(|e| invalid(format!("bad regex '{pattern}': {e}")))?;
                }
                self.file_patterns = patterns;
            }
            "log_file" => {
                let trimmed = value.trim();
                self.log_file = (!trimmed.is_empty()).then(|| clean_path(trimmed));
            }
            "log_level" => self.log_level = value.parse().map_err(invalid)?,
            "log_max_size" => {
                self.log_max_size = value
                    .trim()
                    .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c.is_whitespace())
                    .parse()
                    .map_err(|e| invalid(format!("{e}")))?;
            }
            "log_backup_count" => {
                self.log_backup_count = value
                    .trim()
                    .parse()
                    .map_err(|e| invalid(format!("{e}")))?;
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Add a watched folder. Returns `false` if it was already present.
    pub fn add_watched_folder(&mut self, folder: PathBuf) -> bool {
        if self.watched_folders.contains(&folder) {
            return false;
        }
        self.watched_folders.push(folder);
        true
    }

    /// Remove a watched folder. Returns `false` if it was not present.
    pub fn remove_watched_folder(&mut self, folder: &Path) -> bool {
        let before = self.watched_folders.len();
        self.watched_folders.retain(|f| f != folder);
        self.watched_folders.len() != before
    }

    /// Watched folders that currently exist; missing ones are logged and skipped.
    #[must_use]
    pub fn existing_watched_folders(&self) -> Vec<PathBuf> {
        self.watched_folders
            .iter()
            .filter(|folder| {
                let exists = folder.is_dir();
                if !exists {
                    log::warn!("Watched folder does not exist: {}", folder.display());
                }
                exists
            })
            .cloned()
            .collect()
    }
}

/// Platform locations of the config, log and lock files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Directory holding all three files
    pub config_dir: PathBuf,
    /// TOML config file
    pub config_file: PathBuf,
    /// Default log file
    pub log_file: PathBuf,
    /// Single-instance lock file
    pub lock_file: PathBuf,
}

impl AppPaths {
    /// Resolve paths, relocating everything next to `config_override` if given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if no platform config directory exists.
    pub fn discover(config_override: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(file) = config_override {
            let dir = file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            return Ok(Self::in_dir(dir, file.to_path_buf()));
        }

        let dirs = ProjectDirs::from("com", "dupeguard", "dupeguard").ok_or(ConfigError::NoConfigDir)?;
        let dir = dirs.config_dir().to_path_buf();
        Ok(Self::in_dir(dir.clone(), dir.join("config.toml")))
    }

    /// Paths with all files inside `dir`.
    #[must_use]
    pub fn in_dir(dir: PathBuf, config_file: PathBuf) -> Self {
        Self {
            log_file: dir.join("dupeguard.log"),
            lock_file: dir.join("dupeguard.lock"),
            config_file,
            config_dir: dir,
        }
    }

    /// The log file in effect for `config`.
    #[must_use]
    pub fn log_file_for(&self, config: &Config) -> PathBuf {
        config.log_file.clone().unwrap_or_else(|| self.log_file.clone())
    }
}

/// Default quarantine root.
///
/// `~/Quarantined_Duplicates`, or `Documents/Quarantined_Duplicates` on
/// Windows unless Documents is redirected into OneDrive.
#[must_use]
pub fn default_quarantine_path() -> PathBuf {
    let Some(dirs) = UserDirs::new() else {
        return PathBuf::from(QUARANTINE_DIR_NAME);
    };

    if cfg!(windows) {
        if let Some(docs) = dirs.document_dir() {
            let synced = docs.components().any(|c| c.as_os_str() == "OneDrive");
            if !synced {
                return docs.join(QUARANTINE_DIR_NAME);
            }
        }
    }

    dirs.home_dir().join(QUARANTINE_DIR_NAME)
}

/// Normalize a user-typed path.
///
/// Strips surrounding whitespace and one pair of matching quotes,
/// unescapes `\ ` (drag-and-drop on macOS terminals) and expands a leading `~`.
#[must_use]
pub fn clean_path(input: &str) -> PathBuf {
    let mut s = input.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = &s[1..s.len() - 1];
            break;
        }
    }
    let s = s.replace("\\ ", " ");

    if s == "~" || s.starts_with("~/") {
        if let Some(dirs) = UserDirs::new() {
            let rest = s.trim_start_matches('~').trim_start_matches('/');
            return if rest.is_empty() {
                dirs.home_dir().to_path_buf()
            } else {
                dirs.home_dir().join(rest)
            };
        }
    }
    PathBuf::from(s)
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(format!("expected true/false, got '{other}'")),
    }
}

fn parse_list(value: &str) -> Result<Vec<String>, String> {
    let trimmed = value.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| e.to_string());
    }
    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

fn render_list<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    let items: Vec<String> = items.map(|i| i.to_string()).collect();
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn unknown_key(key: &str) -> ConfigError {
    let hint = KEYS
        .iter()
        .map(|k| (strsim::levenshtein(key, k), *k))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, k)| format!(" (did you mean '{k}'?)"))
        .unwrap_or_default();
    ConfigError::UnknownKey {
        key: key.to_string(),
        hint,
    }
}
