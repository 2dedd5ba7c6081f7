//! Request and response types of the listing pages

use serde::{Deserialize, Deserializer, Serialize};
use studiomap_core::{CompanyStatus, LIST_URL, MAP_URL};

/// Query string of the map and list pages
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    /// Free text search
    #[serde(default)]
    pub search: String,

    /// Status of the listed companies (default: open)
    #[serde(default)]
    pub company_status: CompanyStatus,

    /// `force_cache_reset=1` empties the page cache before rendering
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub force_cache_reset: bool,
}

/// Form body of `POST /directory/get_partners`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetPartnersForm {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub company_status: CompanyStatus,
}

/// Data of the map page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapPageResponse {
    /// Markers as a JSON string, `{ "<id>": [lat, lon, html] }`
    pub geoloc: String,
    pub search: String,
    pub company_status: CompanyStatus,
    pub partner_count: usize,
    /// URL of the current page keeping the search parameters
    pub keep: String,
    pub map_url: String,
    pub list_url: String,
    pub url: String,
}

/// Data of the list page; rows are fetched separately through
/// `POST /directory/get_partners`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPageResponse {
    pub search: String,
    pub company_status: CompanyStatus,
    pub keep: String,
    pub map_url: String,
    pub list_url: String,
    pub url: String,
}

impl ListPageResponse {
    pub fn new(query: &ListingQuery) -> Self {
        Self {
            search: query.search.clone(),
            company_status: query.company_status,
            keep: keep_url(LIST_URL, &query.search, query.company_status),
            map_url: MAP_URL.to_string(),
            list_url: LIST_URL.to_string(),
            url: LIST_URL.to_string(),
        }
    }
}

/// `url` with the current search parameters, empty search omitted
///
/// ```
/// use studiomap_core::CompanyStatus;
/// use studiomap_serve::listing::types::keep_url;
///
/// assert_eq!(
///     keep_url("/directory", "3d art", CompanyStatus::Open),
///     "/directory?search=3d%20art&company_status=open"
/// );
/// assert_eq!(
///     keep_url("/directory/list", "", CompanyStatus::Closed),
///     "/directory/list?company_status=closed"
/// );
/// ```
pub fn keep_url(url: &str, search: &str, status: CompanyStatus) -> String {
    if search.is_empty() {
        format!("{}?company_status={}", url, status)
    } else {
        format!(
            "{}?search={}&company_status={}",
            url,
            urlencoding::encode(search),
            status
        )
    }
}

/// Accepts `1`, `true`, `on` and `yes` as a set flag, anything else unset
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.is_some_and(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        )
    }))
}
