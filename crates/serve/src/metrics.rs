//! Listing metrics for monitoring and observability
//!
//! Provides Prometheus metrics for the listing caches: current size, hit
//! and miss counts, and payload build duration. Without the `metrics`
//! feature every recorder is a no-op.

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, Encoder,
    HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};

#[cfg(feature = "metrics")]
/// Global listing metrics instance, `None` if registration failed
pub static LISTING_METRICS: Lazy<Option<ListingMetrics>> = Lazy::new(|| {
    ListingMetrics::new()
        .map_err(|e| tracing::warn!("Failed to initialize listing metrics: {}", e))
        .ok()
});

/// Listing metrics collector
#[cfg(feature = "metrics")]
pub struct ListingMetrics {
    /// Current number of entries per listing cache
    pub cache_size: IntGaugeVec,
    /// Cache lookups by cache and outcome
    pub cache_operations_total: IntCounterVec,
    /// Payload build duration in seconds
    pub build_duration_seconds: HistogramVec,
}

#[cfg(feature = "metrics")]
impl ListingMetrics {
    /// Creates and registers the listing metrics
    ///
    /// # Errors
    ///
    /// Returns error if metrics registration fails
    pub fn new() -> Result<Self, prometheus::Error> {
        let cache_size = register_int_gauge_vec!(
            "studiomap_listing_cache_size",
            "Current number of entries in a listing cache",
            &["cache"]
        )?;

        let cache_operations_total = register_int_counter_vec!(
            "studiomap_listing_cache_operations_total",
            "Listing cache lookups",
            &["cache", "outcome"]
        )?;

        let build_duration_seconds = register_histogram_vec!(
            "studiomap_listing_build_duration_seconds",
            "Listing payload build duration in seconds",
            &["cache"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        )?;

        Ok(Self {
            cache_size,
            cache_operations_total,
            build_duration_seconds,
        })
    }
}

/// Records a cache lookup outcome (`hit` or `miss`)
pub fn record_cache_operation(cache: &str, outcome: &str) {
    #[cfg(feature = "metrics")]
    if let Some(metrics) = LISTING_METRICS.as_ref() {
        metrics
            .cache_operations_total
            .with_label_values(&[cache, outcome])
            .inc();
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (cache, outcome);
}

/// Updates the cache size gauge
pub fn update_cache_size(cache: &str, size: u64) {
    #[cfg(feature = "metrics")]
    if let Some(metrics) = LISTING_METRICS.as_ref() {
        metrics
            .cache_size
            .with_label_values(&[cache])
            .set(i64::try_from(size).unwrap_or(i64::MAX));
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (cache, size);
}

/// Records how long building a payload took
pub fn record_build_duration(cache: &str, seconds: f64) {
    #[cfg(feature = "metrics")]
    if let Some(metrics) = LISTING_METRICS.as_ref() {
        metrics
            .build_duration_seconds
            .with_label_values(&[cache])
            .observe(seconds);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (cache, seconds);
}

/// Renders every registered metric in the Prometheus text format
#[cfg(feature = "metrics")]
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_do_not_panic() {
        record_cache_operation("list", "hit");
        record_cache_operation("map", "miss");
        update_cache_size("list", 3);
        record_build_duration("map", 0.25);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_render_exposes_listing_metrics() {
        update_cache_size("list", 4);
        let text = render().unwrap();
        assert!(text.contains("studiomap_listing_cache_size"));
    }
}
