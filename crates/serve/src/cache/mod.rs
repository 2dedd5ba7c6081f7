//! Caching module for Studiomap serve crate
//!
//! Keeps rendered listing payloads so repeated searches over the same
//! companies skip the database join and the rendering.

pub mod listing_cache;

pub use listing_cache::{
    CacheOutcome, CachedPayload, ListingCache, ListingCacheConfig, ListingCacheKey,
};
