//! Configuration management for search-lab
//!
//! Sources, highest precedence first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (TOML)
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Query defaults
    #[serde(default)]
    pub query: QueryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the built front-end
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// URL prefix the front-end is served under
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// Database user
    #[serde(default)]
    pub username: Option<String>,

    /// Database password
    #[serde(default)]
    pub password: Option<String>,

    /// Cluster host, or a full `mongodb://` / `mongodb+srv://` URI
    #[serde(default)]
    pub location: Option<String>,

    /// Database queries run against
    #[serde(default = "default_database")]
    pub database: String,

    /// Connect and server selection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Retry a failed startup connection on later requests
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,

    /// Minimum seconds between reconnect attempts
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval: u64,
}

/// Query defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryConfig {
    /// Collection used when a request names none
    #[serde(default = "default_collection")]
    pub default_collection: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_base_path() -> String {
    "/search-lab".to_string()
}

fn default_database() -> String {
    "library_clean".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_reconnect() -> bool {
    true
}

fn default_reconnect_interval() -> u64 {
    30
}

fn default_collection() -> String {
    "movies".to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            base_path: default_base_path(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            location: None,
            database: default_database(),
            timeout: default_timeout(),
            reconnect: default_reconnect(),
            reconnect_interval: default_reconnect_interval(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_collection: default_collection(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        Ok(config)
    }

    /// Load file (explicit path or default location), then environment.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override values from the environment.
    ///
    /// `lookup` returns the value of a variable; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(username) = get("MONGODB_USERNAME") {
            self.connection.username = Some(username);
        }
        if let Some(password) = get("MONGODB_PASSWORD") {
            self.connection.password = Some(password);
        }
        if let Some(location) = get("MONGODB_LOCATION") {
            self.connection.location = Some(location);
        }
        if let Some(database) = get("SEARCH_LAB_DATABASE") {
            self.connection.database = database;
        }
        if let Some(host) = get("SEARCH_LAB_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("SEARCH_LAB_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid SEARCH_LAB_PORT '{}'", port),
            }
        }
        if let Some(dir) = get("SEARCH_LAB_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".search-lab")
            .join("config.toml")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if !self.server.base_path.starts_with('/') || self.server.base_path.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "server.base_path".to_string(),
                value: self.server.base_path.clone(),
            }
            .into());
        }

        if self.connection.database.trim().is_empty() {
            return Err(ConfigError::MissingField("connection.database".to_string()).into());
        }

        if self.query.default_collection.trim().is_empty() {
            return Err(ConfigError::MissingField("query.default_collection".to_string()).into());
        }

        Ok(())
    }

}

impl ConnectionConfig {
    /// Both credentials are present and non-empty
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.username) && present(&self.password)
    }

    /// Connection string for `location`, without credentials
    pub fn connection_uri(&self) -> Option<String> {
        let location = self.location.as_deref()?.trim();
        if location.is_empty() {
            return None;
        }

        if location.starts_with("mongodb://") || location.starts_with("mongodb+srv://") {
            Some(location.to_string())
        } else {
            Some(format!("mongodb+srv://{location}"))
        }
    }

    /// Get reconnect interval as Duration
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval)
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
