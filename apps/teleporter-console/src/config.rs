//! # Console Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. `teleporter.toml` (or the file passed with `--config`)
//! 2. Environment variables
//! 3. CLI flags
//!
//! ## Environment Variables
//!
//! - `TELEPORTER_URL`: base URL of the console service used by client commands
//! - `TELEPORTER_API_KEY`: bearer key, enforced by `serve` and sent by clients
//! - `TELEPORTER_RATE_LIMIT`: requests per second, `0` disables limiting
//! - `TELEPORTER_CORS_ORIGINS`: comma-separated origins, or `*` for all
//! - `TELEPORTER_SCHEMA_VERSION`: `v1` or `v2`
//! - `TELEPORTER_DATABASE`: redb file for `serve`; unset keeps the store in memory

use crate::api::ServerSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use teleporter_core::{ConsoleError, SchemaVersion};
use thiserror::Error;

/// Config file read when `--config` is not given. Missing is not an error.
pub const DEFAULT_CONFIG_FILE: &str = "teleporter.toml";

const DEFAULT_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

impl From<ConfigError> for ConsoleError {
    fn from(err: ConfigError) -> Self {
        Self::IoError(err.to_string())
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Service-side settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// redb file; `None` keeps the key space in memory.
    pub database: Option<PathBuf>,
    pub rate_limit: u32,
    /// `None` allows localhost origins only.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            cors_origins: None,
        }
    }
}

/// Complete console configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Console service the client commands talk to.
    pub url: String,
    pub api_key: Option<String>,
    pub schema_version: SchemaVersion,
    pub server: ServerConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            schema_version: SchemaVersion::default(),
            server: ServerConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read an explicit config file. The file must exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&text, path)
    }

    /// Load `path`, or [`DEFAULT_CONFIG_FILE`] if it exists, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Overlay `TELEPORTER_*` variables from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Overlay `TELEPORTER_*` variables read through `lookup`.
    ///
    /// Empty values count as unset, except `TELEPORTER_API_KEY` where an empty
    /// value disables the key.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string());

        if let Some(url) = get("TELEPORTER_URL").filter(|v| !v.is_empty()) {
            self.url = url;
        }
        if let Some(key) = get("TELEPORTER_API_KEY") {
            self.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(raw) = get("TELEPORTER_RATE_LIMIT").filter(|v| !v.is_empty()) {
            self.server.rate_limit = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "TELEPORTER_RATE_LIMIT",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = get("TELEPORTER_CORS_ORIGINS").filter(|v| !v.is_empty()) {
            self.server.cors_origins = Some(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
        if let Some(raw) = get("TELEPORTER_SCHEMA_VERSION").filter(|v| !v.is_empty()) {
            self.schema_version = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "TELEPORTER_SCHEMA_VERSION",
                value: raw.clone(),
            })?;
        }
        if let Some(path) = get("TELEPORTER_DATABASE").filter(|v| !v.is_empty()) {
            self.server.database = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// The subset of settings the HTTP router needs.
    #[must_use]
    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            api_key: self.api_key.clone(),
            rate_limit: self.server.rate_limit,
            cors_origins: self.server.cors_origins.clone(),
        }
    }

    /// `host:port` the service binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
