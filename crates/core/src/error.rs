//! Error handling for Studiomap core library

use thiserror::Error;

/// Result type alias for Studiomap operations
pub type Result<T> = std::result::Result<T, StudiomapError>;

/// Main error type for Studiomap operations
#[derive(Error, Debug)]
pub enum StudiomapError {
    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database driver errors
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Persistence layer errors that are not driver errors
    #[error("Database error: {message}")]
    Database { message: String },

    /// Network connectivity errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },
}

impl StudiomapError {
    /// Create a database error
    pub fn database<S: Into<String>>(message: S) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Check if the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }

    /// Short error category used for metrics labels and log fields
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Sql(_) | Self::Database { .. } => "database",
            Self::Json(_) | Self::Yaml(_) => "serialization",
            Self::Config(_) => "config",
            Self::Template(_) => "template",
            Self::Url(_) => "url",
            Self::Generic(_) => "generic",
            Self::Network { .. } => "network",
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = StudiomapError::validation("bad country id");
        assert_eq!(err.to_string(), "Validation error: bad country id");

        let err = StudiomapError::not_found("partner 42");
        assert_eq!(err.to_string(), "Resource not found: partner 42");

        let err = StudiomapError::database("connection reset");
        assert_eq!(err.to_string(), "Database error: connection reset");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(StudiomapError::validation("x").is_client_error());
        assert!(StudiomapError::not_found("x").is_client_error());
        assert!(!StudiomapError::database("x").is_client_error());
        assert!(!StudiomapError::network("x").is_client_error());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(StudiomapError::database("x").category(), "database");
        assert_eq!(StudiomapError::validation("x").category(), "validation");

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(StudiomapError::from(json_err).category(), "serialization");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StudiomapError = io.into();
        assert!(matches!(err, StudiomapError::Io(_)));
    }
}
