//! The request-handling entry point.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use edge_cache::{CacheOrchestrator, CacheStatus, CacheStore, InMemoryStore, StatusHeader};
use edge_core::{EdgeCacheConfig, EdgeError, EdgeRequest, EdgeResponse};
use edge_data::{HttpOrigin, HttpPurgeProvider, OriginFetch, PurgeProvider, TimeoutConfig};
use edge_executor::BackgroundTasks;
use edge_observability::CacheMetrics;

use crate::error::WorkerError;
use crate::purge::PurgeHandler;
use crate::route::{Route, Router};

/// Edge cache worker.
///
/// Configuration is fixed at construction. Background refreshes started by
/// [`EdgeWorker::handle`] are tracked and must be drained with
/// [`EdgeWorker::shutdown`] before the runtime goes away.
pub struct EdgeWorker {
    config: Arc<EdgeCacheConfig>,
    router: Router,
    origin: Arc<dyn OriginFetch>,
    orchestrator: CacheOrchestrator,
    purge: PurgeHandler,
    tasks: BackgroundTasks,
    metrics: Arc<CacheMetrics>,
    status_header: StatusHeader,
}

impl EdgeWorker {
    /// Build a worker around explicit collaborators.
    pub fn new(
        config: Arc<EdgeCacheConfig>,
        store: Arc<dyn CacheStore>,
        origin: Arc<dyn OriginFetch>,
        provider: Arc<dyn PurgeProvider>,
    ) -> Result<Self, WorkerError> {
        config.validate()?;

        let tasks = BackgroundTasks::new();
        let metrics = Arc::new(CacheMetrics::new());
        let orchestrator = CacheOrchestrator::new(&config, store.clone(), origin.clone())?
            .with_tasks(tasks.clone())
            .with_metrics(metrics.clone());

        Ok(Self {
            router: Router::new(&config),
            purge: PurgeHandler::new(&config.purge, provider, store),
            status_header: StatusHeader::new(&config.response.status_header),
            origin,
            orchestrator,
            tasks,
            metrics,
            config,
        })
    }

    /// Build a worker with the HTTP collaborators and an in-memory store.
    pub fn from_config(config: Arc<EdgeCacheConfig>) -> Result<Self, WorkerError> {
        let origin = Arc::new(HttpOrigin::new(&config.origin)?);
        let provider = Arc::new(HttpPurgeProvider::new(
            &config.purge,
            &TimeoutConfig::from_config(&config.origin),
        )?);
        Self::new(config, Arc::new(InMemoryStore::new()), origin, provider)
    }

    pub fn config(&self) -> &EdgeCacheConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &CacheOrchestrator {
        &self.orchestrator
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Handle one inbound request.
    ///
    /// Never fails: errors and panics are logged with their detail and
    /// turned into a generic response.
    pub async fn handle(&self, request: EdgeRequest) -> EdgeResponse {
        self.metrics.record_request();

        let outcome = AssertUnwindSafe(self.dispatch(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(EdgeError::InternalError(panic_message(panic))));

        match outcome {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    request_id = %request.request_id,
                    method = %request.method,
                    url = %request.url,
                    kind = err.kind(),
                    error = %err,
                    "request failed"
                );
                let response = err.into_response(self.config.response.legacy_error_status);
                self.status_header.apply(response, CacheStatus::Error)
            }
        }
    }

    async fn dispatch(&self, request: &EdgeRequest) -> Result<EdgeResponse, EdgeError> {
        match self.router.route(request) {
            Route::Purge => {
                self.metrics.record_purge();
                let response = self.purge.purge(request).await?;
                Ok(self.status_header.apply(response, CacheStatus::Purge))
            }
            Route::Bypass(reason) => {
                self.metrics.record_bypass();
                tracing::debug!(request_id = %request.request_id, %reason, "cache bypassed");
                let response = self.origin.fetch(request).await.map_err(|err| {
                    self.metrics.record_origin_failure();
                    EdgeError::from(err)
                })?;
                Ok(self.status_header.apply(response, CacheStatus::Bypass))
            }
            Route::Cache => self.orchestrator.handle(request).await,
        }
    }

    /// Wait for outstanding background refreshes, up to `limit`.
    ///
    /// Returns whether all of them finished.
    pub async fn shutdown(&self, limit: Duration) -> bool {
        let finished = self.tasks.shutdown(limit).await;
        tracing::info!(metrics = %self.metrics.snapshot().to_summary(), "worker stopped");
        finished
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "panic: boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "panic: bang");
        assert_eq!(panic_message(Box::new(7u8)), "panic");
    }

    #[test]
    fn test_from_config_rejects_bad_tracking_pattern() {
        let mut config = EdgeCacheConfig::default();
        config.key.tracking_pattern = "(".to_string();
        assert!(matches!(
            EdgeWorker::from_config(Arc::new(config)),
            Err(WorkerError::Config(_))
        ));
    }
}
