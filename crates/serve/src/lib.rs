//! Studiomap Serve Library
//!
//! Web server interface for the Studiomap directory: map and list listing
//! pages backed by cached payloads, search bar suggestions, company pages
//! and profile edition.

use studiomap_core::config::ServerSettings;

pub mod api;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod metrics;
pub mod server;

pub use handlers::AppState;
pub use listing::ListingService;
pub use server::*;

/// Server version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            cors_enabled: settings.cors_enabled,
            max_request_size: settings.max_request_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8069);
        assert!(config.cors_enabled);
        assert_eq!(config.max_request_size, 10 * 1024 * 1024);
    }
}
