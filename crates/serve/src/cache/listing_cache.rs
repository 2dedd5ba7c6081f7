//! Listing payload caching
//!
//! Rendering the list and map payloads for a large result set is expensive,
//! so each rendered payload is kept for a while keyed by the exact set of
//! companies it was built from.

use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use studiomap_core::{CacheSettings, CompanyStatus, ListingKind, PartnerId, Result};
use tracing::debug;

/// Cache key for a rendered payload
///
/// Two requests share an entry only when they render the same kind of
/// payload, for the same status, over the same ordered companies. A search
/// returning a different record set after a data update therefore never
/// reuses a stale entry.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ListingCacheKey {
    pub kind: ListingKind,
    pub status: CompanyStatus,
    pub ids: Vec<PartnerId>,
}

impl ListingCacheKey {
    /// Creates a new cache key
    ///
    /// # Examples
    ///
    /// ```
    /// use studiomap_core::{CompanyStatus, ListingKind, PartnerId};
    /// use studiomap_serve::cache::ListingCacheKey;
    ///
    /// let key = ListingCacheKey::new(ListingKind::List, CompanyStatus::Open, vec![PartnerId(3)]);
    /// assert_eq!(key.ids.len(), 1);
    /// ```
    pub fn new(kind: ListingKind, status: CompanyStatus, ids: Vec<PartnerId>) -> Self {
        Self { kind, status, ids }
    }
}

/// Cached payload
#[derive(Debug, Clone)]
pub struct CachedPayload {
    /// Rendered JSON
    pub payload: Arc<str>,
    /// Cache timestamp
    pub cached_at: chrono::DateTime<chrono::Utc>,
}

impl CachedPayload {
    pub fn new(payload: String) -> Self {
        Self {
            payload: payload.into(),
            cached_at: chrono::Utc::now(),
        }
    }
}

/// Whether a lookup was served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
        }
    }
}

/// Listing cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingCacheConfig {
    /// Maximum number of entries in cache
    pub max_size: u64,
    /// Time to live of an entry
    pub ttl: Duration,
}

impl Default for ListingCacheConfig {
    fn default() -> Self {
        CacheSettings::default().into()
    }
}

impl From<CacheSettings> for ListingCacheConfig {
    fn from(settings: CacheSettings) -> Self {
        Self {
            max_size: settings.max_size,
            ttl: Duration::from_secs(settings.ttl_seconds),
        }
    }
}

impl ListingCacheConfig {
    pub fn new(max_size: u64, ttl: Duration) -> Self {
        Self { max_size, ttl }
    }
}

/// Time and size bounded cache of rendered listing payloads
///
/// Concurrent misses on the same key may both build the payload; the last
/// insert wins. Builds are deterministic for a given key so this only costs
/// duplicated work.
pub struct ListingCache {
    cache: Cache<ListingCacheKey, CachedPayload>,
    config: ListingCacheConfig,
}

impl ListingCache {
    /// Creates a new listing cache
    ///
    /// # Examples
    ///
    /// ```
    /// use studiomap_serve::cache::{ListingCache, ListingCacheConfig};
    ///
    /// let cache = ListingCache::new(ListingCacheConfig::default());
    /// assert_eq!(cache.entry_count(), 0);
    /// ```
    pub fn new(config: ListingCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_size)
            .time_to_live(config.ttl)
            .build();

        Self { cache, config }
    }

    /// Returns the cached payload for `key`, building and storing it on a miss
    ///
    /// # Errors
    ///
    /// Returns the error of `build`; nothing is stored in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use studiomap_core::{CompanyStatus, ListingKind};
    /// use studiomap_serve::cache::{CacheOutcome, ListingCache, ListingCacheConfig, ListingCacheKey};
    ///
    /// # tokio_test::block_on(async {
    /// let cache = ListingCache::new(ListingCacheConfig::default());
    /// let key = ListingCacheKey::new(ListingKind::Map, CompanyStatus::Open, Vec::new());
    ///
    /// let (payload, outcome) = cache
    ///     .get_or_build(key.clone(), || async { Ok("{}".to_string()) })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(&*payload.payload, "{}");
    /// assert_eq!(outcome, CacheOutcome::Miss);
    ///
    /// let (_, outcome) = cache
    ///     .get_or_build(key, || async { Ok("ignored".to_string()) })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(outcome, CacheOutcome::Hit);
    /// # });
    /// ```
    pub async fn get_or_build<F, Fut>(
        &self,
        key: ListingCacheKey,
        build: F,
    ) -> Result<(CachedPayload, CacheOutcome)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(cached) = self.cache.get(&key).await {
            debug!(kind = %key.kind, "listing cache hit");
            return Ok((cached, CacheOutcome::Hit));
        }

        debug!(kind = %key.kind, partners = key.ids.len(), "listing cache miss");
        let cached = CachedPayload::new(build().await?);
        self.cache.insert(key, cached.clone()).await;
        Ok((cached, CacheOutcome::Miss))
    }

    /// Gets a cached payload without building it
    pub async fn get(&self, key: &ListingCacheKey) -> Option<CachedPayload> {
        self.cache.get(key).await
    }

    /// Drops every entry
    ///
    /// The next lookup of any key is a miss once this returns.
    pub async fn reset(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Gets the cache entry count
    ///
    /// The count is updated lazily by moka; call [`ListingCache::sync`]
    /// first for an exact figure.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Applies pending evictions and expirations
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Gets the cache configuration
    pub fn config(&self) -> &ListingCacheConfig {
        &self.config
    }
}
