//! Lookup, refresh-ahead origin fetch and write-back.
//!
//! Every cacheable request starts an origin fetch before the store is
//! consulted. The fetch runs as a tracked background task: it annotates
//! the origin response, hands it to the waiting handler (if any), and then
//! writes the decorated copy to the store. The write is not part of the
//! client's latency and still happens when the handler answered from cache.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use http::Method;
use tokio::sync::oneshot;

use edge_core::{EdgeCacheConfig, EdgeError, EdgeRequest, EdgeResponse};
use edge_data::{FetchError, OriginFetch};
use edge_executor::BackgroundTasks;
use edge_observability::CacheMetrics;

use crate::error::CacheResult;
use crate::headers::{CacheStatus, StatusHeader};
use crate::key::{CacheKey, KeyNormalizer};
use crate::policy::{Freshness, FreshnessPolicy};
use crate::store::{CacheStore, CachedEntry};

/// Origin response on its way from the background task to the handler.
struct PendingOrigin {
    rx: oneshot::Receiver<Result<EdgeResponse, FetchError>>,
}

impl PendingOrigin {
    async fn wait(self) -> Result<EdgeResponse, EdgeError> {
        match self.rx.await {
            Ok(result) => result.map_err(EdgeError::from),
            Err(_) => Err(EdgeError::InternalError(
                "origin task ended without a response".to_string(),
            )),
        }
    }
}

/// Coordinates the cache path for requests that passed the bypass check.
pub struct CacheOrchestrator {
    store: Arc<dyn CacheStore>,
    origin: Arc<dyn OriginFetch>,
    normalizer: KeyNormalizer,
    policy: Arc<FreshnessPolicy>,
    tasks: BackgroundTasks,
    metrics: Arc<CacheMetrics>,
    status_header: StatusHeader,
}

impl CacheOrchestrator {
    /// Build the orchestrator and its policies from configuration.
    pub fn new(
        config: &EdgeCacheConfig,
        store: Arc<dyn CacheStore>,
        origin: Arc<dyn OriginFetch>,
    ) -> CacheResult<Self> {
        Ok(Self {
            store,
            origin,
            normalizer: KeyNormalizer::new(&config.key)?,
            policy: Arc::new(FreshnessPolicy::new(&config.freshness)),
            tasks: BackgroundTasks::new(),
            metrics: Arc::new(CacheMetrics::new()),
            status_header: StatusHeader::new(&config.response.status_header),
        })
    }

    /// Use a shared background task set.
    pub fn with_tasks(mut self, tasks: BackgroundTasks) -> Self {
        self.tasks = tasks;
        self
    }

    /// Use shared counters.
    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn normalizer(&self) -> &KeyNormalizer {
        &self.normalizer
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// Answer a cacheable request.
    pub async fn handle(&self, request: &EdgeRequest) -> Result<EdgeResponse, EdgeError> {
        let key = self.normalizer.normalize(request);
        let pending = self.spawn_origin(request, &key);

        let cached = match self.store.lookup(&key).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(
                    request_id = %request.request_id,
                    cache_key = %key,
                    error = %err,
                    "cache lookup failed, treating as miss"
                );
                None
            }
        };

        if let Some(entry) = cached {
            let now = Utc::now();
            match entry.freshness_at(now) {
                Freshness::Fresh => {
                    self.metrics.record_hit();
                    tracing::debug!(request_id = %request.request_id, cache_key = %key, "cache hit");
                    return Ok(self.serve_entry(request, &entry, CacheStatus::Hit));
                }
                Freshness::StaleWhileRevalidate => {
                    self.metrics.record_stale();
                    tracing::debug!(
                        request_id = %request.request_id,
                        cache_key = %key,
                        "serving stale while revalidating"
                    );
                    return Ok(self.serve_entry(request, &entry, CacheStatus::Stale));
                }
                Freshness::StaleIfError => {
                    return Ok(self.serve_or_fall_back(request, &key, &entry, pending).await);
                }
                Freshness::Expired => {}
            }
        }

        self.metrics.record_miss();
        let response = pending.wait().await?;
        tracing::debug!(
            request_id = %request.request_id,
            cache_key = %key,
            status = response.status.as_u16(),
            "cache miss served from origin"
        );
        Ok(self.status_header.apply(response, CacheStatus::Miss))
    }

    /// Wait for the origin; fall back to the stale entry if it fails.
    async fn serve_or_fall_back(
        &self,
        request: &EdgeRequest,
        key: &CacheKey,
        entry: &CachedEntry,
        pending: PendingOrigin,
    ) -> EdgeResponse {
        match pending.wait().await {
            Ok(response) if !response.status.is_server_error() => {
                self.metrics.record_miss();
                self.status_header.apply(response, CacheStatus::Miss)
            }
            Ok(response) => {
                self.metrics.record_stale_if_error();
                tracing::info!(
                    request_id = %request.request_id,
                    cache_key = %key,
                    status = response.status.as_u16(),
                    "origin answered with a server error, serving stale"
                );
                self.serve_entry(request, entry, CacheStatus::Stale)
            }
            Err(err) => {
                self.metrics.record_stale_if_error();
                tracing::info!(
                    request_id = %request.request_id,
                    cache_key = %key,
                    error = %err,
                    "origin failed, serving stale"
                );
                self.serve_entry(request, entry, CacheStatus::Stale)
            }
        }
    }

    fn serve_entry(
        &self,
        request: &EdgeRequest,
        entry: &CachedEntry,
        status: CacheStatus,
    ) -> EdgeResponse {
        let mut response = entry.to_response(Utc::now());
        if request.method == Method::HEAD {
            response.body = Bytes::new();
        }
        self.status_header.apply(response, status)
    }

    /// Start the tracked origin fetch for a request.
    ///
    /// Only GET responses are written back; a HEAD answer has no body to
    /// serve later.
    fn spawn_origin(&self, request: &EdgeRequest, key: &CacheKey) -> PendingOrigin {
        let (tx, rx) = oneshot::channel();
        let store = self.store.clone();
        let origin = self.origin.clone();
        let policy = self.policy.clone();
        let metrics = self.metrics.clone();
        let request = request.clone();
        let key = key.clone();
        let writable = request.method == Method::GET;

        self.tasks.spawn(async move {
            let result = origin.fetch(&request).await.map(|r| policy.annotate(r));

            let to_store = match &result {
                Ok(annotated) if annotated.cacheable && writable => {
                    Some(annotated.response.clone())
                }
                Ok(_) => None,
                Err(err) => {
                    metrics.record_origin_failure();
                    tracing::warn!(
                        request_id = %request.request_id,
                        cache_key = %key,
                        error = %err,
                        "origin fetch failed"
                    );
                    None
                }
            };

            // The handler may already have answered from cache.
            let _ = tx.send(result.map(|annotated| annotated.response));

            if let Some(response) = to_store {
                match store.store(&key, response).await {
                    Ok(()) => {
                        metrics.record_store();
                        tracing::debug!(request_id = %request.request_id, cache_key = %key, "stored origin response");
                    }
                    Err(err) => {
                        metrics.record_store_failure();
                        tracing::warn!(
                            request_id = %request.request_id,
                            cache_key = %key,
                            error = %err,
                            "cache write failed"
                        );
                    }
                }
            }
        });

        PendingOrigin { rx }
    }
}
