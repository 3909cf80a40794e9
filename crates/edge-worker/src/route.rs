//! Request routing.

use http::Method;

use edge_cache::{BypassEvaluator, BypassReason};
use edge_core::{EdgeCacheConfig, EdgeRequest};

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Relay to the purge provider.
    Purge,
    /// Skip the cache: no lookup, no store.
    Bypass(BypassReason),
    /// Normal cache path.
    Cache,
}

/// Picks a route for each request.
#[derive(Debug, Clone)]
pub struct Router {
    purge_param: String,
    bypass: BypassEvaluator,
}

impl Router {
    pub fn new(config: &EdgeCacheConfig) -> Self {
        Self {
            purge_param: config.purge.query_param.clone(),
            bypass: BypassEvaluator::new(&config.bypass),
        }
    }

    /// Whether the request is a purge trigger: a POST carrying the purge
    /// query parameter.
    pub fn is_purge(&self, request: &EdgeRequest) -> bool {
        request.method == Method::POST && request.has_query_param(&self.purge_param)
    }

    pub fn route(&self, request: &EdgeRequest) -> Route {
        if self.is_purge(request) {
            return Route::Purge;
        }
        match self.bypass.evaluate(request) {
            Some(reason) => Route::Bypass(reason),
            None => Route::Cache,
        }
    }
}
