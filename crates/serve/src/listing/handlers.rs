//! Listing page handlers
//!
//! # Endpoints
//!
//! - `GET /directory` - Map page data, markers included
//! - `GET /directory/list` - List page context
//! - `POST /directory/get_partners` - List rows as a JSON string
//!
//! Both pages accept `force_cache_reset=1` to rebuild their cache, for
//! example after a bulk data update:
//!
//! ```text
//! GET /directory?force_cache_reset=1
//! GET /directory/list?force_cache_reset=1
//! ```

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json},
    routing::{get, post},
    Form, Router,
};
use studiomap_core::{ListingKind, LIST_URL, MAP_URL};
use tracing::debug;

use crate::error::ApiResult;
use crate::handlers::AppState;
use crate::listing::types::{
    keep_url, GetPartnersForm, ListPageResponse, ListingQuery, MapPageResponse,
};

/// Creates the listing routes
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route(MAP_URL, get(handle_map))
        .route(LIST_URL, get(handle_list))
        .route("/directory/get_partners", post(handle_get_partners))
}

/// Map page: markers for every company matching the search
pub async fn handle_map(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<Json<MapPageResponse>> {
    let map = state
        .listing
        .map_payload(&query.search, query.company_status, query.force_cache_reset)
        .await?;

    Ok(Json(MapPageResponse {
        geoloc: map.geoloc.to_string(),
        search: query.search.clone(),
        company_status: query.company_status,
        partner_count: map.partner_count,
        keep: keep_url(MAP_URL, &query.search, query.company_status),
        map_url: MAP_URL.to_string(),
        list_url: LIST_URL.to_string(),
        url: MAP_URL.to_string(),
    }))
}

/// List page: context only, rows are loaded by `get_partners`
pub async fn handle_list(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Json<ListPageResponse> {
    debug!("force_cache_reset: {}", query.force_cache_reset);
    if query.force_cache_reset {
        state.listing.reset_cache(ListingKind::List).await;
    }
    Json(ListPageResponse::new(&query))
}

/// Rows of the list page for the posted search
pub async fn handle_get_partners(
    State(state): State<AppState>,
    Form(form): Form<GetPartnersForm>,
) -> ApiResult<impl IntoResponse> {
    let payload = state
        .listing
        .list_payload(&form.search, form.company_status, false)
        .await?;

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        payload.to_string(),
    ))
}
