//! Listing service
//!
//! Resolves a search into the matching companies and returns the rendered
//! list or map payload for them, going through the listing caches.

use std::sync::Arc;
use std::time::Instant;
use studiomap_core::{
    CompanyStatus, ListingKind, Partner, PartnerId, PayloadRenderer, Result, SearchDomainBuilder,
    SharedPartnerStore,
};
use tracing::{debug, info};

use crate::cache::{CacheOutcome, ListingCache, ListingCacheConfig, ListingCacheKey};
use crate::metrics;

/// Map payload with the number of companies it was built from
#[derive(Debug, Clone)]
pub struct MapPayload {
    /// `{ "<id>": [lat, lon, html] }` JSON
    pub geoloc: Arc<str>,
    /// Number of companies matching the search, including those without
    /// a marker
    pub partner_count: usize,
}

/// Builds listing payloads on top of a partner store
pub struct ListingService {
    store: SharedPartnerStore,
    renderer: PayloadRenderer,
    list_cache: ListingCache,
    map_cache: ListingCache,
}

impl ListingService {
    /// Creates a service with its own list and map caches
    pub fn new(
        store: SharedPartnerStore,
        list_cache: ListingCacheConfig,
        map_cache: ListingCacheConfig,
    ) -> Result<Self> {
        Ok(Self {
            store,
            renderer: PayloadRenderer::new()?,
            list_cache: ListingCache::new(list_cache),
            map_cache: ListingCache::new(map_cache),
        })
    }

    pub fn store(&self) -> &SharedPartnerStore {
        &self.store
    }

    pub fn list_cache(&self) -> &ListingCache {
        &self.list_cache
    }

    pub fn map_cache(&self) -> &ListingCache {
        &self.map_cache
    }

    fn cache(&self, kind: ListingKind) -> &ListingCache {
        match kind {
            ListingKind::List => &self.list_cache,
            ListingKind::Map => &self.map_cache,
        }
    }

    /// Companies matching `search`, ordered by name
    pub async fn search(&self, search: &str, status: CompanyStatus) -> Result<Vec<Partner>> {
        debug!("search: {}", search);
        debug!("company_status: {}", status);

        let domain = SearchDomainBuilder::new(search, status).build();
        let start = Instant::now();
        let partners = self.store.search(&domain).await?;
        debug!("Query time: {:?}", start.elapsed());
        Ok(partners)
    }

    /// One zero based page of the companies matching `search`
    pub async fn search_page(
        &self,
        search: &str,
        status: CompanyStatus,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Partner>> {
        debug!("search: {} (page {} of {})", search, page, page_size);
        let domain = SearchDomainBuilder::new(search, status)
            .page(page, page_size)
            .build();
        self.store.search(&domain).await
    }

    /// JSON array of row summaries for the list view
    ///
    /// With `force_reset` the list cache is emptied first.
    pub async fn list_payload(
        &self,
        search: &str,
        status: CompanyStatus,
        force_reset: bool,
    ) -> Result<Arc<str>> {
        if force_reset {
            self.reset_cache(ListingKind::List).await;
        }

        let partners = self.search(search, status).await?;
        let key = ListingCacheKey::new(ListingKind::List, status, ids_of(&partners));

        let renderer = &self.renderer;
        let partners = &partners;
        self.cached(key, move || async move { renderer.list_payload(partners, status) })
            .await
    }

    /// Map markers for the map view
    ///
    /// With `force_reset` the map cache is emptied first.
    pub async fn map_payload(
        &self,
        search: &str,
        status: CompanyStatus,
        force_reset: bool,
    ) -> Result<MapPayload> {
        if force_reset {
            self.reset_cache(ListingKind::Map).await;
        }

        let partners = self.search(search, status).await?;
        let ids = ids_of(&partners);
        let key = ListingCacheKey::new(ListingKind::Map, status, ids.clone());

        let (store, renderer, ids) = (&self.store, &self.renderer, &ids);
        let geoloc = self
            .cached(key, move || async move {
                let rows = store.map_rows(ids).await?;
                renderer.map_payload(&rows, status)
            })
            .await?;

        Ok(MapPayload {
            geoloc,
            partner_count: partners.len(),
        })
    }

    /// Empties both listing caches
    pub async fn reset_caches(&self) {
        self.reset_cache(ListingKind::List).await;
        self.reset_cache(ListingKind::Map).await;
    }

    /// Empties the cache of one listing page
    pub async fn reset_cache(&self, kind: ListingKind) {
        info!("Reset the cache {}_cache", kind);
        let cache = self.cache(kind);
        cache.reset().await;
        metrics::update_cache_size(&kind.to_string(), cache.entry_count());
    }

    async fn cached<F, Fut>(&self, key: ListingCacheKey, build: F) -> Result<Arc<str>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String>>,
    {
        let kind = key.kind.to_string();
        let cache = self.cache(key.kind);

        let start = Instant::now();
        let (cached, outcome) = cache.get_or_build(key, build).await?;
        let elapsed = start.elapsed();

        metrics::record_cache_operation(&kind, outcome.as_str());
        if outcome == CacheOutcome::Miss {
            metrics::record_build_duration(&kind, elapsed.as_secs_f64());
        }
        metrics::update_cache_size(&kind, cache.entry_count());
        debug!("{}_cache.currsize: {}", kind, cache.entry_count());
        debug!("dump timing: {:?}", elapsed);

        Ok(cached.payload)
    }
}

fn ids_of(partners: &[Partner]) -> Vec<PartnerId> {
    partners.iter().map(|p| p.id).collect()
}
