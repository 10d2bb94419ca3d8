//! Configuration management for restaurant-knowledge.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::contents::FileLocation;
use crate::error::{Error, Result};
use crate::storage::{RemoteTarget, StorageMode};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name under the platform config dir.
const APP_DIR_NAME: &str = "restaurant-knowledge";

/// Default location of the collection, both on disk and inside the repository.
const DEFAULT_DATA_PATH: &str = "data/restaurants.json";

/// Prefix for environment overrides, e.g. `RESTAURANT_KNOWLEDGE_SERVER__BIND`.
const ENV_PREFIX: &str = "RESTAURANT_KNOWLEDGE_";

/// Conventional variables understood for the remote backend.
const GITHUB_ENV_VARS: [&str; 4] = [
    "GITHUB_OWNER",
    "GITHUB_REPO",
    "GITHUB_TOKEN",
    "GITHUB_DATA_PATH",
];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. `GITHUB_OWNER`, `GITHUB_REPO`, `GITHUB_TOKEN`, `GITHUB_DATA_PATH`
/// 2. Environment variables (prefixed with `RESTAURANT_KNOWLEDGE_`, `__` between section and key)
/// 3. TOML config file at `~/.config/restaurant-knowledge/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Local storage configuration.
    pub storage: StorageConfig,
    /// Remote repository configuration.
    pub remote: RemoteConfig,
    /// Thumbnail lookup configuration.
    pub thumbnail: ThumbnailConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
}

/// Local storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON file used when no access token is configured.
    pub data_path: PathBuf,
}

/// Remote repository configuration.
///
/// The remote backend is used exactly when `token` is set and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Access token for the contents API.
    pub token: Option<String>,
    /// Path of the JSON file inside the repository.
    pub path: String,
    /// Root URL of the contents API.
    pub api_base: String,
    /// Per-request timeout in seconds. Set to 0 for no timeout.
    pub timeout_secs: u64,
}

/// Thumbnail lookup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// User-Agent sent when fetching pages.
    pub user_agent: String,
    /// Per-request timeout in seconds. Set to 0 for no timeout.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: None,
            path: DEFAULT_DATA_PATH.to_string(),
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; RestaurantKnowledge/1.0)".to_string(),
            timeout_secs: 10,
        }
    }
}

impl RemoteConfig {
    /// Whether a non-empty access token is configured.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file).nested())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&GITHUB_ENV_VARS).map(|key| {
                let field = key.as_str().to_ascii_lowercase().replacen("github_", "", 1);
                let field = if field == "data_path" { "path" } else { field.as_str() };
                format!("remote.{field}").into()
            }))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        if self.remote.has_token() {
            if self.remote.owner.trim().is_empty() || self.remote.repo.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "remote.owner and remote.repo are required when a token is set"
                        .to_string(),
                });
            }
            if self.remote.path.trim_matches('/').is_empty() {
                return Err(Error::ConfigValidation {
                    message: "remote.path must name a file".to_string(),
                });
            }
        }

        if !(self.remote.api_base.starts_with("https://")
            || self.remote.api_base.starts_with("http://"))
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "remote.api_base must be an http(s) URL: {}",
                    self.remote.api_base
                ),
            });
        }

        Ok(())
    }

    /// Parse the listen address.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| Error::ConfigValidation {
                message: format!("invalid server.bind '{}': {e}", self.server.bind),
            })
    }

    /// Decide which backend holds the collection.
    #[must_use]
    pub fn storage_mode(&self) -> StorageMode {
        match self.remote.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => StorageMode::Remote(RemoteTarget {
                location: FileLocation::new(
                    self.remote.owner.trim(),
                    self.remote.repo.trim(),
                    self.remote.path.trim_matches('/'),
                ),
                token: token.to_string(),
                api_base: self.remote.api_base.clone(),
                timeout: seconds(self.remote.timeout_secs),
            }),
            _ => StorageMode::Local {
                path: self.storage.data_path.clone(),
            },
        }
    }

    /// Get the thumbnail fetch timeout.
    #[must_use]
    pub fn thumbnail_timeout(&self) -> Option<Duration> {
        seconds(self.thumbnail.timeout_secs)
    }

    /// A copy safe to print: the access token is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.remote.has_token() {
            copy.remote.token = Some("********".to_string());
        }
        copy
    }
}
