//! Cache outcome counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide cache counters.
///
/// Shared behind an `Arc`; every method takes `&self`.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    requests: AtomicU64,
    hits: AtomicU64,
    stale: AtomicU64,
    stale_if_error: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    stores: AtomicU64,
    store_failures: AtomicU64,
    origin_failures: AtomicU64,
    purges: AtomicU64,
}

/// Point-in-time copy of `CacheMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub hits: u64,
    pub stale: u64,
    pub stale_if_error: u64,
    pub misses: u64,
    pub bypasses: u64,
    pub stores: u64,
    pub store_failures: u64,
    pub origin_failures: u64,
    pub purges: u64,
}

impl CacheMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A stale entry served while revalidating.
    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    /// A stale entry served because the origin failed.
    pub fn record_stale_if_error(&self) {
        self.stale_if_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_origin_failure(&self) {
        self.origin_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_purge(&self) {
        self.purges.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            stale_if_error: self.stale_if_error.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            origin_failures: self.origin_failures.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Share of cache-eligible requests answered from the cache.
    pub fn hit_ratio(&self) -> Option<f64> {
        let served = self.hits + self.stale + self.stale_if_error;
        let eligible = served + self.misses;
        (eligible > 0).then(|| served as f64 / eligible as f64)
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// One-line summary for logs.
    pub fn to_summary(&self) -> String {
        let mut s = format!(
            "requests={} hit={} stale={} stale_if_error={} miss={} bypass={}",
            self.requests, self.hits, self.stale, self.stale_if_error, self.misses, self.bypasses
        );
        if self.origin_failures > 0 {
            s.push_str(&format!(" origin_failures={}", self.origin_failures));
        }
        if let Some(ratio) = self.hit_ratio() {
            s.push_str(&format!(" hit_ratio={:.2}", ratio));
        }
        s
    }
}
