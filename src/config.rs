use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use liftlog_core::{SyncMode, UserScope};

/// Default time to wait for the first remote snapshots.
const DEFAULT_WAIT_MS: u64 = 3000;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// Server URL (e.g., "http://localhost:8080")
    pub server_url: Option<String>,
    /// API key sent as a bearer token
    pub api_key: Option<String>,
    /// Keep collections on the server instead of only locally
    #[serde(default)]
    pub enabled: bool,
    /// Milliseconds to wait for the first snapshots after attaching
    pub wait_ms: Option<u64>,
}

impl SyncConfig {
    /// Returns true if a server URL is set
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some()
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms.unwrap_or(DEFAULT_WAIT_MS))
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory for the workout draft and other local files
    pub data_dir: ConfigValue<PathBuf>,
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// User whose remote collections are used
    pub user: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Sync configuration
    pub sync: SyncConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    user: Option<String>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading environment variables through `env`.
    pub fn load_with_env<F>(config_path: Option<PathBuf>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_data_dir = Self::default_data_dir();

        // Start with defaults
        let mut data_dir = ConfigValue::new(default_data_dir.clone(), ConfigSource::Default);
        let mut database_path: Option<ConfigValue<PathBuf>> = None;
        let mut user = ConfigValue::new("default".to_string(), ConfigSource::Default);
        let mut config_file = None;
        let mut sync = SyncConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                data_dir = ConfigValue::new(resolve(&path, dir), ConfigSource::File);
            }
            if let Some(db_path) = file_config.database_path {
                database_path = Some(ConfigValue::new(resolve(&path, db_path), ConfigSource::File));
            }
            if let Some(name) = file_config.user {
                user = ConfigValue::new(name, ConfigSource::File);
            }
            if let Some(sync_config) = file_config.sync {
                sync = sync_config;
            }
        }

        // Apply environment variable overrides
        if let Some(dir) = env("LIFTLOG_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Some(db_path) = env("LIFTLOG_DATABASE_PATH") {
            database_path = Some(ConfigValue::new(
                PathBuf::from(db_path),
                ConfigSource::Environment,
            ));
        }
        if let Some(name) = env("LIFTLOG_USER") {
            user = ConfigValue::new(name, ConfigSource::Environment);
        }
        if let Some(url) = env("LIFTLOG_SYNC_URL") {
            sync.server_url = Some(url);
        }
        if let Some(key) = env("LIFTLOG_SYNC_API_KEY") {
            sync.api_key = Some(key);
        }
        if let Some(enabled) = env("LIFTLOG_SYNC_ENABLED") {
            sync.enabled = matches!(enabled.as_str(), "1" | "true" | "yes");
        }

        // The database lives in the data directory unless set explicitly
        let database_path = database_path.unwrap_or_else(|| {
            ConfigValue::new(data_dir.value.join("liftlog.db"), data_dir.source.clone())
        });

        Ok(Self {
            data_dir,
            database_path,
            user,
            config_file,
            sync,
        })
    }

    /// Remote mode needs both a server and sync switched on.
    pub fn sync_mode(&self) -> SyncMode {
        if self.sync.enabled && self.sync.is_configured() {
            SyncMode::Remote
        } else {
            SyncMode::Local
        }
    }

    /// The configured user as a remote scope.
    pub fn user_scope(&self) -> Result<UserScope, liftlog_core::SyncError> {
        UserScope::new(&self.user.value)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/liftlog/
    /// - macOS: ~/Library/Application Support/liftlog/
    /// - Windows: %APPDATA%/liftlog/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftlog")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/liftlog/
    /// - macOS: ~/Library/Application Support/liftlog/
    /// - Windows: %APPDATA%/liftlog/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftlog")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
