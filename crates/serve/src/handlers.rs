//! HTTP handlers for Studiomap serve crate
//!
//! Listing pages live in [`crate::listing`]; this module holds the shared
//! application state and the remaining directory endpoints: search bar
//! suggestions, company pages and profile edition, favorites, "locate me"
//! statistics and the homepage country counts.

use axum::{
    async_trait,
    extract::{FromRequestParts, Multipart, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studiomap_core::config::ListingConfig;
use studiomap_core::models::parse_slug_id;
use studiomap_core::store::{self, random_studios_from_same_location};
use studiomap_core::{
    CountryCount, LocateMeStat, Partner, PartnerForm, PartnerId, SharedPartnerStore,
    StudiomapConfig, StudiomapError, UserId,
};
use tracing::{debug, info};

use crate::cache::ListingCacheConfig;
use crate::error::{ApiError, ApiResult};
use crate::listing::ListingService;
use crate::ServerConfig;

/// Header carrying the id of the signed-in website user
pub const USER_ID_HEADER: &str = "x-user-id";

/// Number of nearby studios suggested on a company page
pub const SAME_LOCATION_SAMPLE: usize = 4;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedPartnerStore,
    pub listing: Arc<ListingService>,
    pub config: ServerConfig,
}

impl AppState {
    /// Create new application state, opening the configured store
    pub async fn new(config: &StudiomapConfig) -> studiomap_core::Result<Self> {
        let store = store::open(&config.database).await?;
        Self::from_store(store, &config.listing, ServerConfig::from(&config.server))
    }

    /// Create application state from an existing store (for testing)
    pub fn from_store(
        store: SharedPartnerStore,
        listing: &ListingConfig,
        config: ServerConfig,
    ) -> studiomap_core::Result<Self> {
        let listing = ListingService::new(
            store.clone(),
            ListingCacheConfig::from(listing.list_cache),
            ListingCacheConfig::from(listing.map_cache),
        )?;

        Ok(Self {
            store,
            listing: Arc::new(listing),
            config,
        })
    }
}

/// Website user making the request, if any
///
/// Read from the `x-user-id` header set by the authenticating proxy.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Option<UserId>);

impl CurrentUser {
    pub fn require(self) -> ApiResult<UserId> {
        self.0.ok_or_else(|| {
            ApiError::from(StudiomapError::validation(format!(
                "Header '{}' is required",
                USER_ID_HEADER
            )))
        })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Self(None));
        };
        let id = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| StudiomapError::validation("Invalid user id header"))?;
        Ok(Self(Some(UserId(id))))
    }
}

/// Health check endpoint
pub async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Homepage: number of companies per country
pub async fn handle_homepage(State(state): State<AppState>) -> ApiResult<Json<HomepageResponse>> {
    let by_countries = state.store.count_by_country().await?;
    Ok(Json(HomepageResponse { by_countries }))
}

/// Search bar suggestions
pub async fn handle_autocomplete(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let term = query.term.unwrap_or_default();
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let values = state.store.autocomplete(&term).await?;
    Ok(Json(values))
}

/// Company page
pub async fn handle_company_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    user: CurrentUser,
) -> ApiResult<Json<CompanyPageResponse>> {
    let id = parse_slug_id(&slug)
        .ok_or_else(|| StudiomapError::not_found(format!("company page {}", slug)))?;
    let partner = state.store.get(id).await?;

    let favorite = match user.0 {
        Some(user) => Some(state.store.is_favorite(id, user).await?),
        None => None,
    };
    let same_location =
        random_studios_from_same_location(state.store.as_ref(), &partner, &[], SAME_LOCATION_SAMPLE)
            .await?
            .iter()
            .map(StudioCard::from)
            .collect();

    Ok(Json(CompanyPageResponse::new(partner, favorite, same_location)))
}

/// Set or unset a company as a favorite of the current user
pub async fn handle_favorite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
    Json(request): Json<FavoriteRequest>,
) -> ApiResult<Json<FavoriteResponse>> {
    let user = user.require()?;
    let id = PartnerId(id);
    state.store.set_favorite(id, user, request.favorite).await?;
    debug!("User {} favorite of {}: {}", user, id, request.favorite);

    Ok(Json(FavoriteResponse {
        id,
        favorite: request.favorite,
    }))
}

/// Create a company from the profile form
pub async fn handle_create_company(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_profile_form(multipart).await?;
    let partner = state.store.create_partner(&form).await?;
    info!("Company {} created", partner.id);

    Ok((
        StatusCode::CREATED,
        Json(CompanyPageResponse::new(partner, None, Vec::new())),
    ))
}

/// Save the profile form of an existing company
pub async fn handle_save_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<CompanyPageResponse>> {
    let form = read_profile_form(multipart).await?;
    let partner = state.store.update_partner(PartnerId(id), &form).await?;
    info!("Company {} saved", partner.id);

    Ok(Json(CompanyPageResponse::new(partner, None, Vec::new())))
}

/// Record a use of the "locate me" map button
pub async fn handle_locate_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<LocateMeRequest>,
) -> ApiResult<StatusCode> {
    let stat = LocateMeStat::new(user.0, request.success, request.latitude, request.longitude);
    state.store.add_locate_me_stat(&stat).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Collect the multipart profile form: text fields plus the `image_file`
/// upload
async fn read_profile_form(mut multipart: Multipart) -> ApiResult<PartnerForm> {
    fn invalid(e: axum::extract::multipart::MultipartError) -> ApiError {
        StudiomapError::validation(format!("Invalid form data: {}", e)).into()
    }

    let mut fields = Vec::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image_file" {
            image = Some(field.bytes().await.map_err(invalid)?);
        } else {
            fields.push((name, field.text().await.map_err(invalid)?));
        }
    }

    Ok(PartnerForm::from_post(fields, image.as_deref())?)
}

// Request types

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    pub term: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct LocateMeRequest {
    pub success: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// Response types

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomepageResponse {
    pub by_countries: Vec<CountryCount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteResponse {
    pub id: PartnerId,
    pub favorite: bool,
}

/// Short presentation of a company linking to its page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioCard {
    pub id: PartnerId,
    pub name: String,
    pub url: String,
    pub image_url: String,
    pub city: Option<String>,
}

impl From<&Partner> for StudioCard {
    fn from(partner: &Partner) -> Self {
        Self {
            id: partner.id,
            name: partner.name.clone(),
            url: partner.url(),
            image_url: partner.small_image_url(),
            city: partner.city.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanyPageResponse {
    pub partner: Partner,
    pub url: String,
    pub full_location: String,
    /// Only known when the request carries a user
    pub favorite: Option<bool>,
    pub same_location: Vec<StudioCard>,
}

impl CompanyPageResponse {
    pub fn new(partner: Partner, favorite: Option<bool>, same_location: Vec<StudioCard>) -> Self {
        Self {
            url: partner.url(),
            full_location: partner.full_location(),
            partner,
            favorite,
            same_location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn current_user(header: Option<&str>) -> Result<CurrentUser, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_current_user_header() {
        assert_eq!(current_user(Some("7")).await.unwrap().0, Some(UserId(7)));
        assert_eq!(current_user(None).await.unwrap().0, None);
        assert!(current_user(Some("bob")).await.is_err());
    }

    #[test]
    fn test_require_user() {
        assert!(CurrentUser(None).require().is_err());
        assert_eq!(CurrentUser(Some(UserId(2))).require().unwrap(), UserId(2));
    }

    #[test]
    fn test_company_page_response() {
        let mut partner = Partner::new(5, "Blue Fox");
        partner.city = Some("Lyon".to_string());
        let page = CompanyPageResponse::new(partner, Some(true), Vec::new());
        assert_eq!(page.url, "/directory/company/blue-fox-5");
        assert_eq!(page.full_location, ", , Lyon, ");
        assert_eq!(page.favorite, Some(true));
    }
}
