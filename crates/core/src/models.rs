//! Directory data model
//!
//! Plain records exchanged with the persistence layer. A [`Partner`] is a
//! company listed in the directory together with its resolved relations
//! (state, country, industries), so that search predicates and payload
//! shaping never need another round-trip to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CompanyStatus, PartnerId, UserId};

/// Id/name pair of a related record (country, state, industry)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

impl NamedRef {
    pub fn new<S: Into<String>>(id: i64, name: S) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Industry tag attached to companies
pub type Industry = NamedRef;

/// Phone numbers of a company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calls {
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub fax: Option<String>,
}

/// Social network profile URLs of a company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialNetworks {
    pub linkedin: Option<String>,
    pub vimeo: Option<String>,
    pub youtube: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
}

/// A company listed in the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub is_company: bool,
    #[serde(default)]
    pub status: CompanyStatus,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub street2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub state: Option<NamedRef>,
    #[serde(default)]
    pub country: Option<NamedRef>,
    #[serde(default)]
    pub industries: Vec<Industry>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Base64 encoded logo
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub calls: Calls,
    #[serde(default)]
    pub social_networks: SocialNetworks,
    #[serde(default)]
    pub write_date: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Partner {
    /// Create an active, open company with only a name set
    pub fn new<S: Into<String>>(id: i64, name: S) -> Self {
        Self {
            id: PartnerId(id),
            name: name.into(),
            active: true,
            is_company: true,
            status: CompanyStatus::Open,
            email: None,
            website: None,
            street: None,
            street2: None,
            city: None,
            zip: None,
            state: None,
            country: None,
            industries: Vec::new(),
            latitude: None,
            longitude: None,
            image: None,
            calls: Calls::default(),
            social_networks: SocialNetworks::default(),
            write_date: None,
        }
    }

    pub fn state_name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.name.as_str())
    }

    pub fn country_name(&self) -> Option<&str> {
        self.country.as_ref().map(|c| c.name.as_str())
    }

    pub fn industry_names(&self) -> impl Iterator<Item = &str> {
        self.industries.iter().map(|i| i.name.as_str())
    }

    /// URL-safe slug of the company used in its public page URL
    ///
    /// ```
    /// use studiomap_core::models::Partner;
    ///
    /// let partner = Partner::new(12, "Blue Fox Studio!");
    /// assert_eq!(partner.slug(), "blue-fox-studio-12");
    /// ```
    pub fn slug(&self) -> String {
        slugify(self.id, &self.name)
    }

    /// Public page of the company
    pub fn url(&self) -> String {
        company_url(self.id, &self.name)
    }

    /// URL of the small version of the company logo
    pub fn small_image_url(&self) -> String {
        format!("/website/image/res.partner/{}/image_small", self.id)
    }

    /// Address as a single line: street, street2, city and state
    ///
    /// Missing parts are kept as empty segments so the line keeps a stable
    /// shape on the company page.
    pub fn full_location(&self) -> String {
        [
            self.street.as_deref().unwrap_or(""),
            self.street2.as_deref().unwrap_or(""),
            self.city.as_deref().unwrap_or(""),
            self.state_name().unwrap_or(""),
        ]
        .join(", ")
    }

    /// Whether the record satisfies the fixed listing predicates
    pub fn is_listed(&self, status: CompanyStatus) -> bool {
        self.active && self.is_company && self.status == status
    }
}

/// Slug of a company page: lowercased alphanumeric runs joined by `-`,
/// followed by the id
pub fn slugify(id: PartnerId, name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        id.to_string()
    } else {
        format!("{}-{}", slug, id)
    }
}

/// Public page of a company
pub fn company_url(id: PartnerId, name: &str) -> String {
    format!("/directory/company/{}", slugify(id, name))
}

/// Partner id at the end of a company page slug
///
/// Accepts both a bare id (`"12"`) and a full slug (`"blue-fox-12"`).
pub fn parse_slug_id(slug: &str) -> Option<PartnerId> {
    slug.rsplit('-').next()?.parse().ok().map(PartnerId)
}

/// One row of the geo join: a partner repeated once per industry
///
/// Only partners having a state, a country and at least one industry
/// produce rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRow {
    pub id: PartnerId,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: String,
    pub city: Option<String>,
    pub state_name: String,
    pub country_name: String,
    pub industry_name: String,
}

/// Usage record of the "locate me" map feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocateMeStat {
    pub user_id: Option<UserId>,
    pub success: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl LocateMeStat {
    /// Build a stat entry; coordinates are kept only when both are known
    pub fn new(
        user_id: Option<UserId>,
        success: bool,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Self {
        let (latitude, longitude) = match (latitude, longitude) {
            (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
            _ => (None, None),
        };
        Self {
            user_id,
            success,
            latitude,
            longitude,
            created_at: Utc::now(),
        }
    }
}

/// Number of listed companies in one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: NamedRef,
    pub count: usize,
}
