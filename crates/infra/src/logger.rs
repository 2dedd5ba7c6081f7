//! Logging infrastructure for Studiomap
//!
//! Installs the global `tracing` subscriber. The level comes from the
//! configuration file, `STUDIOMAP_LOG_*` variables or the command line;
//! `RUST_LOG` directives are honoured on top of it.

use std::str::FromStr;
use studiomap_core::config::LoggingConfig;
use studiomap_core::{Result, StudiomapError};
use tracing::Level;
use tracing_subscriber::{
    filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Crates logging too much at `info`
const QUIET_TARGETS: &[&str] = &["hyper=warn", "h2=warn", "sqlx=warn"];

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to use JSON format
    pub json_format: bool,
    /// Whether to include timestamps
    pub with_timestamps: bool,
    /// Whether to include file/line information
    pub with_file_info: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamps: true,
            with_file_info: false,
        }
    }
}

impl From<&LoggingConfig> for LoggerConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            json_format: config.json,
            ..Self::default()
        }
    }
}

impl LoggerConfig {
    /// Override the level, keeping the output format
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }
}

fn directive(value: &str) -> Result<Directive> {
    value
        .parse()
        .map_err(|e| StudiomapError::validation(format!("Invalid log directive '{}': {}", value, e)))
}

/// Initialize the global logger with the given configuration
pub fn init_logger(config: LoggerConfig) -> Result<()> {
    let level = LogLevel::parse(&config.level)?;

    let mut env_filter = EnvFilter::from_default_env().add_directive(level.into());
    for target in QUIET_TARGETS {
        env_filter = env_filter.add_directive(directive(target)?);
    }

    let fmt_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info)
            .boxed()
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info);

        if config.with_timestamps {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| StudiomapError::validation(format!("Failed to initialize logger: {}", e)))?;

    tracing::debug!("Logger initialized with level: {}", config.level);
    Ok(())
}

/// Initialize logger for testing (reduces noise)
pub fn init_test_logger() {
    let config = LoggerConfig {
        level: "warn".to_string(),
        with_timestamps: false,
        ..LoggerConfig::default()
    };

    // Already initialized by another test
    let _ = init_logger(config);
}

/// Create a logger configuration from `STUDIOMAP_LOG_*` variables,
/// starting from `base`
pub fn logger_config_from_env(base: LoggerConfig) -> LoggerConfig {
    fn flag(name: &str, default: bool) -> bool {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    LoggerConfig {
        level: std::env::var("STUDIOMAP_LOG_LEVEL").unwrap_or(base.level),
        json_format: flag("STUDIOMAP_LOG_JSON", base.json_format),
        with_timestamps: flag("STUDIOMAP_LOG_TIMESTAMPS", base.with_timestamps),
        with_file_info: flag("STUDIOMAP_LOG_FILE_INFO", base.with_file_info),
    }
}

/// Log level utilities
pub struct LogLevel;

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level: &str) -> Result<Level> {
        Level::from_str(level)
            .map_err(|e| StudiomapError::validation(format!("Invalid log level '{}': {}", level, e)))
    }

    /// Get all available log levels
    pub fn all_levels() -> &'static [&'static str] {
        &["trace", "debug", "info", "warn", "error"]
    }

    /// Check if a log level string is valid
    pub fn is_valid(level: &str) -> bool {
        Self::all_levels().contains(&level.to_lowercase().as_str())
    }
}
