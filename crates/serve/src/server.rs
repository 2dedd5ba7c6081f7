//! Server module for Studiomap serve crate

use crate::api::create_routes;
use crate::handlers::{AppState, USER_ID_HEADER};

use crate::ServerConfig;
use axum::{
    http::{header::CONTENT_TYPE, HeaderName, Method},
    Router,
};
use std::net::SocketAddr;
use studiomap_core::{Result, StudiomapConfig, StudiomapError};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Studiomap HTTP server
pub struct StudiomapServer {
    config: ServerConfig,
    app: Router,
}

impl StudiomapServer {
    /// Create a new server, opening the configured partner store
    pub async fn new(config: &StudiomapConfig) -> Result<Self> {
        let state = AppState::new(config).await?;
        Ok(Self::with_state(state))
    }

    /// Create a server around existing application state
    pub fn with_state(state: AppState) -> Self {
        let config = state.config.clone();
        let app = create_app(state);
        Self { config, app }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| StudiomapError::validation(format!("Invalid address {}: {}", addr, e)))?;

        tracing::info!("Starting Studiomap server on {}", addr);

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| StudiomapError::network(format!("Failed to bind to {}: {}", addr, e)))?;

        axum::serve(listener, self.app)
            .await
            .map_err(|e| StudiomapError::network(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the router, for driving the server in-process
    pub fn router(&self) -> Router {
        self.app.clone()
    }
}

/// Create the Axum application with middleware
pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();
    let mut app = create_routes().with_state(state);

    // Add middleware layers
    app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(config.max_request_size)),
    );

    // Add CORS if enabled
    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)]);

        app = app.layer(cors);
    }

    app
}

/// Server builder for configuration
pub struct ServerBuilder {
    config: StudiomapConfig,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: StudiomapConfig::default(),
        }
    }

    /// Start from a loaded configuration
    pub fn from_config(config: StudiomapConfig) -> Self {
        Self { config }
    }

    /// Set the host address
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Set the database URL
    pub fn database_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.database.url = Some(url.into());
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enabled: bool) -> Self {
        self.config.server.cors_enabled = enabled;
        self
    }

    /// Set maximum request size
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.config.server.max_request_size = size;
        self
    }

    /// Build the server with async initialization
    pub async fn build(self) -> Result<StudiomapServer> {
        self.config.validate()?;
        StudiomapServer::new(&self.config).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
