//! Bypass rule evaluation.

use serde::Serialize;

use edge_core::{BypassConfig, EdgeRequest};

/// Why a request skipped the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "matched", rename_all = "lowercase")]
pub enum BypassReason {
    /// Method is not cacheable.
    Method(String),
    /// A cookie entry starts with a configured bypass cookie.
    Cookie(String),
    /// A configured bypass header is present.
    Header(String),
    /// The path contains a configured substring.
    Path(String),
    /// The query string contains a configured substring.
    Query(String),
}

impl std::fmt::Display for BypassReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Method(m) => write!(f, "method {}", m),
            Self::Cookie(c) => write!(f, "cookie {}", c),
            Self::Header(h) => write!(f, "header {}", h),
            Self::Path(p) => write!(f, "path {}", p),
            Self::Query(q) => write!(f, "query {}", q),
        }
    }
}

/// Decides, before any key derivation or lookup, whether a request skips
/// caching. Rules are OR-combined and checked in a fixed order; the first
/// match wins.
#[derive(Debug, Clone)]
pub struct BypassEvaluator {
    config: BypassConfig,
}

impl BypassEvaluator {
    /// Create a new evaluator.
    pub fn new(config: &BypassConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Whether the request must skip caching.
    pub fn should_bypass(&self, request: &EdgeRequest) -> bool {
        self.evaluate(request).is_some()
    }

    /// The first matching bypass rule, if any.
    pub fn evaluate(&self, request: &EdgeRequest) -> Option<BypassReason> {
        self.check_method(request)
            .or_else(|| self.check_cookies(request))
            .or_else(|| self.check_headers(request))
            .or_else(|| self.check_path(request))
            .or_else(|| self.check_query(request))
    }

    fn check_method(&self, request: &EdgeRequest) -> Option<BypassReason> {
        let method = request.method.as_str();
        let cacheable = self
            .config
            .cacheable_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method));
        (!cacheable).then(|| BypassReason::Method(method.to_string()))
    }

    fn check_cookies(&self, request: &EdgeRequest) -> Option<BypassReason> {
        if self.config.cookies.is_empty() {
            return None;
        }
        for cookie in request.cookies() {
            for bypass in &self.config.cookies {
                if cookie.starts_with(bypass.as_str()) {
                    return Some(BypassReason::Cookie(bypass.clone()));
                }
            }
        }
        None
    }

    fn check_headers(&self, request: &EdgeRequest) -> Option<BypassReason> {
        self.config
            .headers
            .iter()
            .find(|name| request.headers.contains_key(name.as_str()))
            .map(|name| BypassReason::Header(name.clone()))
    }

    fn check_path(&self, request: &EdgeRequest) -> Option<BypassReason> {
        let path = request.url.path();
        self.config
            .paths
            .iter()
            .find(|fragment| path.contains(fragment.as_str()))
            .map(|fragment| BypassReason::Path(fragment.clone()))
    }

    fn check_query(&self, request: &EdgeRequest) -> Option<BypassReason> {
        let search = request.search();
        self.config
            .queries
            .iter()
            .find(|fragment| search.contains(fragment.as_str()))
            .map(|fragment| BypassReason::Query(fragment.clone()))
    }
}
