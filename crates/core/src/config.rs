//! Configuration types for Studiomap
//!
//! Configuration is read from a YAML (or JSON) file with [`StudiomapConfig::from_file`],
//! or layered from an optional file plus `STUDIOMAP__SECTION__KEY`
//! environment variables with [`StudiomapConfig::load`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::{Result, StudiomapError};

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "STUDIOMAP";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudiomapConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Persistence settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Listing pages and their caches
    #[serde(default)]
    pub listing: ListingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            max_request_size: default_max_request_size(),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; when absent the in-memory store is used
    pub url: Option<String>,
    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// JSON or YAML file with partners loaded into the in-memory store
    pub fixtures: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            fixtures: None,
        }
    }
}

/// Cache bounds of one listing cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of cached payloads
    #[serde(default = "default_cache_max_size")]
    pub max_size: u64,
    /// Time to live of a cached payload in seconds
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

/// Listing page settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Number of companies per page when searching page by page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub list_cache: CacheSettings,
    #[serde(default)]
    pub map_cache: CacheSettings,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            list_cache: CacheSettings::default(),
            map_cache: CacheSettings::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to emit JSON lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl StudiomapConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        // Try YAML first, then JSON
        match serde_yaml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(_) => {
                let config = serde_json::from_str(&content)?;
                Ok(config)
            }
        }
    }

    /// Load configuration from an optional file overridden by the environment
    ///
    /// `STUDIOMAP__SERVER__PORT=8080` overrides `server.port`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(StudiomapError::validation("Server port cannot be 0"));
        }

        if let Some(url) = &self.database.url {
            let parsed = Url::parse(url)?;
            if parsed.scheme() != "postgres" && parsed.scheme() != "postgresql" {
                return Err(StudiomapError::validation(
                    "Database URL must use the postgres scheme",
                ));
            }
        }

        if self.listing.page_size == 0 {
            return Err(StudiomapError::validation("Page size must be greater than 0"));
        }

        for (name, cache) in [
            ("list_cache", &self.listing.list_cache),
            ("map_cache", &self.listing.map_cache),
        ] {
            if cache.max_size == 0 {
                return Err(StudiomapError::validation(format!(
                    "{}.max_size must be greater than 0",
                    name
                )));
            }
            if cache.ttl_seconds == 0 {
                return Err(StudiomapError::validation(format!(
                    "{}.ttl_seconds must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8069
}
fn default_max_request_size() -> usize {
    10 * 1024 * 1024
}
fn default_max_connections() -> u32 {
    10
}
fn default_cache_max_size() -> u64 {
    10
}
fn default_cache_ttl_seconds() -> u64 {
    10800
}
fn default_page_size() -> usize {
    20
}
fn default_log_level() -> String {
    "info".to_string()
}
