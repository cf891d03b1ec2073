//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/vintel/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/vintel/` (~/.config/vintel/)
//! - Data: `$XDG_DATA_HOME/vintel/` (~/.local/share/vintel/)
//! - State/Logs: `$XDG_STATE_HOME/vintel/` (~/.local/state/vintel/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Chat log pipeline settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Location catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings consumed by the chat pipeline
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Override for the chat log directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Intel rooms to watch (matched case-insensitively)
    #[serde(default)]
    pub rooms: Vec<String>,

    /// Messages older than this are dropped
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: i64,

    /// Trailing lines replayed per file on rewind
    #[serde(default = "default_replay_lines")]
    pub replay_lines: usize,

    /// Header length of a freshly created log file
    #[serde(default = "default_header_lines")]
    pub header_lines: usize,

    /// Files modified within this window are tracked at startup
    #[serde(default = "default_startup_max_age_secs")]
    pub startup_max_age_secs: u64,

    /// Offset between the local clock and game time
    #[serde(default)]
    pub time_offset_secs: i64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            rooms: vec![],
            expiry_secs: default_expiry_secs(),
            replay_lines: default_replay_lines(),
            header_lines: default_header_lines(),
            startup_max_age_secs: default_startup_max_age_secs(),
            time_offset_secs: 0,
        }
    }
}

impl ChatConfig {
    /// Watched rooms, lower-cased.
    pub fn normalized_rooms(&self) -> Vec<String> {
        self.rooms.iter().map(|r| r.trim().to_lowercase()).collect()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.expiry_secs <= 0 {
            return Err(Error::Config(
                "chat.expiry_secs must be positive".to_string(),
            ));
        }
        if self.header_lines == 0 {
            return Err(Error::Config(
                "chat.header_lines must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_expiry_secs() -> i64 {
    20 * 60
}

fn default_replay_lines() -> usize {
    500
}

fn default_header_lines() -> usize {
    13
}

fn default_startup_max_age_secs() -> u64 {
    60 * 60 * 24
}

/// Location catalog configuration
#[derive(Debug, Deserialize, Default)]
pub struct CatalogConfig {
    /// Path to the JSON catalog (defaults to the data directory)
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,

    /// Override for the log directory
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    /// Log directory: the configured override or the state dir.
    pub fn log_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(Config::state_dir)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.chat.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/vintel/config.toml` (~/.config/vintel/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("vintel").join("config.toml")
    }

    /// Returns the data directory path (for the location catalog)
    ///
    /// `$XDG_DATA_HOME/vintel/` (~/.local/share/vintel/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("vintel")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/vintel/` (~/.local/state/vintel/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("vintel")
    }

    /// Chat log directory: the configured override or the game client's default.
    pub fn log_dir(&self) -> PathBuf {
        self.chat
            .log_dir
            .clone()
            .unwrap_or_else(|| home_dir().join("Documents/EVE/logs/Chatlogs"))
    }

    /// Location catalog path: the configured override or `systems.json` in the data dir.
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("systems.json"))
    }

    /// Ensure XDG environment variables are set to their defaults.
    ///
    /// Call this early in main() so every path helper agrees, even on
    /// systems that leave the variables unset.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        for (var, default) in [
            ("XDG_DATA_HOME", ".local/share"),
            ("XDG_STATE_HOME", ".local/state"),
            ("XDG_CONFIG_HOME", ".config"),
        ] {
            if std::env::var_os(var).is_none() {
                std::env::set_var(var, home.join(default));
            }
        }
    }
}
