//! # Back-Office Configuration
//!
//! ## Load Order (later overrides earlier)
//! 1. Default values
//! 2. Config file (`backoffice.toml` in the platform config directory)
//! 3. Environment variables (`LANNA_*`)
//!
//! ## Example Config File
//! ```toml
//! [database]
//! path = "/var/lib/lanna/lanna.db"
//! max_connections = 5
//!
//! [logging]
//! filter = "info,lanna=debug,sqlx=warn"
//!
//! [lists]
//! default_page_size = 50
//!
//! [events]
//! retention_days = 30
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use lanna_core::PageSize;

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the application data directory")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. `None` uses the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSettings {
    /// Used when a list request does not name a page size.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSettings {
    /// Acknowledged document events older than this are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_max_connections() -> u32 {
    5
}
fn default_log_filter() -> String {
    "info,lanna=debug,sqlx=warn".to_string()
}
fn default_page_size() -> u32 {
    20
}
fn default_retention_days() -> u32 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

impl Default for ListSettings {
    fn default() -> Self {
        ListSettings {
            default_page_size: default_page_size(),
        }
    }
}

impl Default for EventSettings {
    fn default() -> Self {
        EventSettings {
            retention_days: default_retention_days(),
        }
    }
}

// =============================================================================
// BackofficeConfig
// =============================================================================

/// Complete back-office configuration. Read-only after startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackofficeConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub lists: ListSettings,

    #[serde(default)]
    pub events: EventSettings,
}

impl BackofficeConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading back-office config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if PageSize::try_from(self.lists.default_page_size).is_err() {
            return Err(ConfigError::Invalid(format!(
                "lists.default_page_size must be one of {:?}, got {}",
                PageSize::ALLOWED,
                self.lists.default_page_size
            )));
        }
        if self.events.retention_days == 0 {
            return Err(ConfigError::Invalid(
                "events.retention_days must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `LANNA_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("LANNA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("LANNA_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid LANNA_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(filter) = lookup("LANNA_LOG") {
            self.logging.filter = filter;
        }

        if let Some(size) = lookup("LANNA_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(n) => self.lists.default_page_size = n,
                Err(_) => warn!(value = %size, "Ignoring invalid LANNA_PAGE_SIZE"),
            }
        }

        if let Some(days) = lookup("LANNA_EVENT_RETENTION_DAYS") {
            match days.parse::<u32>() {
                Ok(n) => self.events.retention_days = n,
                Err(_) => warn!(value = %days, "Ignoring invalid LANNA_EVENT_RETENTION_DAYS"),
            }
        }
    }

    /// The configured page size, falling back to the default size.
    pub fn default_page_size(&self) -> PageSize {
        PageSize::try_from(self.lists.default_page_size).unwrap_or_default()
    }

    /// Resolves the database file, creating the data directory if needed.
    ///
    /// ## Platform Defaults
    /// - **Linux**: `~/.local/share/lanna-backoffice/lanna.db`
    /// - **macOS**: `~/Library/Application Support/com.lanna.backoffice/lanna.db`
    /// - **Windows**: `%APPDATA%\lanna\backoffice\data\lanna.db`
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "lanna", "backoffice").ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("lanna.db"))
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "lanna", "backoffice")
            .map(|dirs| dirs.config_dir().join("backoffice.toml"))
    }
}
