//! Client configuration
//!
//! Every setting that would otherwise be a process-wide constant (endpoint,
//! API version, default table prefix, token type tag) lives here so several
//! differently configured clients can coexist in one process.

use crate::error::{Error, Result};
use crate::types::{DEFAULT_DATABASE, DEFAULT_SCHEMA};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default service endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.duckpush.io";

/// Default API version path segment
pub const DEFAULT_API_VERSION: &str = "v1";

/// Literal tag every session token issued by the service starts with
pub const DEFAULT_TOKEN_PREFIX: &str = "st_";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "DUCKPUSH_BASE_URL";

/// Configuration for a [`Client`](crate::Client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the service (without version segment)
    pub base_url: String,

    /// API version path segment, empty for none
    pub api_version: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Database used to expand bare table names
    pub default_database: String,

    /// Schema used to expand bare table names
    pub default_schema: String,

    /// Required prefix of issued session tokens
    pub token_prefix: String,

    /// Total attempts (first try included) of an operation that keeps failing with 401
    pub max_auth_attempts: u32,

    /// Rows per Arrow batch when writing the staged Parquet file
    pub batch_size: usize,

    /// Directory for staged files (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,

    /// Snappy-compress staged files
    pub compression: bool,

    /// Suppress progress output
    pub quiet: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: 300,
            user_agent: format!("duckpush/{}", env!("CARGO_PKG_VERSION")),
            default_database: DEFAULT_DATABASE.to_string(),
            default_schema: DEFAULT_SCHEMA.to_string(),
            token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
            max_auth_attempts: 3,
            batch_size: 8192,
            temp_dir: None,
            compression: true,
            quiet: false,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parse a config from YAML text; missing keys take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Apply overrides from the environment
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the config is usable
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("invalid base_url '{}': {e}", self.base_url)))?;
        if self.max_auth_attempts == 0 {
            return Err(Error::config("max_auth_attempts must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if self.default_database.is_empty() || self.default_schema.is_empty() {
            return Err(Error::config(
                "default_database and default_schema must not be empty",
            ));
        }
        Ok(())
    }

    /// Build the absolute URL of an API path
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let version = self.api_version.trim_matches('/');
        if version.is_empty() {
            format!("{base}/{path}")
        } else {
            format!("{base}/{version}/{path}")
        }
    }
}

/// Builder for [`ClientConfig`]
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the API version segment
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the prefix used to expand bare table names
    pub fn default_table_prefix(
        mut self,
        database: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        self.config.default_database = database.into();
        self.config.default_schema = schema.into();
        self
    }

    /// Set the expected session token prefix
    pub fn token_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.token_prefix = prefix.into();
        self
    }

    /// Set the total attempts for the re-authentication wrapper
    pub fn max_auth_attempts(mut self, attempts: u32) -> Self {
        self.config.max_auth_attempts = attempts;
        self
    }

    /// Set the Arrow batch size for staged files
    pub fn batch_size(mut self, rows: usize) -> Self {
        self.config.batch_size = rows;
        self
    }

    /// Set the directory for staged files
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    /// Enable or disable compression of staged files
    pub fn compression(mut self, enabled: bool) -> Self {
        self.config.compression = enabled;
        self
    }

    /// Suppress progress output
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.config.quiet = quiet;
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
