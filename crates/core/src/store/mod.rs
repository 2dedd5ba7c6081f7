//! Persistence layer for the directory
//!
//! [`PartnerStore`] is the boundary between the listing logic and the
//! database. [`postgres::PgPartnerStore`] talks to PostgreSQL;
//! [`memory::InMemoryPartnerStore`] keeps everything in process and is
//! used by tests, demos and fixture-driven runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::domain::SearchDomain;
use crate::models::{CountryCount, LocateMeStat, MapRow, Partner};
use crate::profile::PartnerForm;
use crate::types::{PartnerId, UserId};
use crate::Result;

pub use memory::InMemoryPartnerStore;
pub use postgres::PgPartnerStore;

/// Storage operations needed by the directory website
#[async_trait]
pub trait PartnerStore: Send + Sync {
    /// Partners matching `domain`, ordered and paged as it requests
    async fn search(&self, domain: &SearchDomain) -> Result<Vec<Partner>>;

    /// Geo join rows for the given partners, one row per industry
    ///
    /// Partners without a state, a country or any industry yield no row.
    async fn map_rows(&self, ids: &[PartnerId]) -> Result<Vec<MapRow>>;

    /// Fetch one partner
    ///
    /// # Errors
    ///
    /// Returns `StudiomapError::NotFound` if no partner has this id
    async fn get(&self, id: PartnerId) -> Result<Partner>;

    /// Search bar suggestions containing `term`, sorted and de-duplicated
    async fn autocomplete(&self, term: &str) -> Result<Vec<String>>;

    /// Create a company from a cleaned profile form
    async fn create_partner(&self, form: &PartnerForm) -> Result<Partner>;

    /// Update a company from a cleaned profile form
    async fn update_partner(&self, id: PartnerId, form: &PartnerForm) -> Result<Partner>;

    /// Add or remove `user` from the users who favorited the partner
    async fn set_favorite(&self, id: PartnerId, user: UserId, favorite: bool) -> Result<()>;

    async fn is_favorite(&self, id: PartnerId, user: UserId) -> Result<bool>;

    /// Record one use of the "locate me" feature
    async fn add_locate_me_stat(&self, stat: &LocateMeStat) -> Result<()>;

    /// Open companies with a logo in `country_id`, except `exclude`
    async fn studios_in_country(
        &self,
        country_id: i64,
        exclude: &[PartnerId],
    ) -> Result<Vec<Partner>>;

    /// Number of active companies per country, zero counts omitted
    async fn count_by_country(&self) -> Result<Vec<CountryCount>>;
}

/// Store shared between request handlers
pub type SharedPartnerStore = Arc<dyn PartnerStore>;

/// Open the store selected by the database settings
///
/// PostgreSQL when a URL is configured, otherwise an in-memory store
/// optionally seeded from the fixtures file.
pub async fn open(config: &DatabaseConfig) -> Result<SharedPartnerStore> {
    if let Some(url) = &config.url {
        let store = PgPartnerStore::connect(url, config.max_connections).await?;
        store.setup_schema().await?;
        return Ok(Arc::new(store));
    }

    let store = match &config.fixtures {
        Some(path) => InMemoryPartnerStore::from_fixture_file(path)?,
        None => InMemoryPartnerStore::new(),
    };
    info!("Using in-memory partner store ({} partners)", store.len());
    Ok(Arc::new(store))
}

/// Random sample of up to `sample` studios located in the same country
/// as `partner`
///
/// The partner itself is never part of the sample, nor is any id listed
/// in `exclude` (typically the instance's own company).
pub async fn random_studios_from_same_location(
    store: &dyn PartnerStore,
    partner: &Partner,
    exclude: &[PartnerId],
    sample: usize,
) -> Result<Vec<Partner>> {
    let Some(country) = &partner.country else {
        return Ok(Vec::new());
    };

    let mut excluded = exclude.to_vec();
    excluded.push(partner.id);

    let mut studios = store.studios_in_country(country.id, &excluded).await?;
    debug!(
        partner = %partner.id,
        candidates = studios.len(),
        sample,
        "sampling studios from same location"
    );

    studios.shuffle(&mut rand::rng());
    studios.truncate(sample);
    Ok(studios)
}
