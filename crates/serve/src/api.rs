//! API module for Studiomap serve crate

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    handle_autocomplete, handle_company_page, handle_create_company, handle_favorite,
    handle_health, handle_homepage, handle_locate_me, handle_save_company, AppState,
};
use crate::listing::listing_routes;

/// API routes configuration
pub fn create_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/", get(handle_homepage))
        .route("/health", get(handle_health))
        .route(
            "/ajax/search_bar/get_auto_complete_search_values",
            get(handle_autocomplete),
        )
        .route("/directory/company/create", post(handle_create_company))
        .route("/directory/company/:id", get(handle_company_page))
        .route("/directory/company/:id/favorite", post(handle_favorite))
        .route("/directory/company/:id/save", post(handle_save_company))
        .route("/locate_me", post(handle_locate_me))
        .merge(listing_routes());

    #[cfg(feature = "metrics")]
    let router = router.route("/metrics", get(handle_metrics));

    router
}

/// Prometheus scrape endpoint
#[cfg(feature = "metrics")]
pub async fn handle_metrics() -> Result<String, axum::http::StatusCode> {
    crate::metrics::render().map_err(|e| {
        tracing::error!("Failed to render metrics: {}", e);
        axum::http::StatusCode::INTERNAL_SERVER_ERROR
    })
}
