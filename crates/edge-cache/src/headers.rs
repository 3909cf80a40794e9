//! Cache status reporting headers.

use http::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use edge_core::EdgeResponse;

/// Header names owned by the cache layer.
pub mod header_names {
    /// Insertion time of a stored entry (RFC 3339). Stripped before serving.
    pub const X_EDGE_STORED_AT: &str = "x-edge-stored-at";
}

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Fresh cache hit.
    Hit,
    /// Stale hit (serving while revalidating, or after an origin error).
    Stale,
    /// Cache miss, served from origin.
    Miss,
    /// Caching skipped for this request.
    Bypass,
    /// Purge request relayed to the provider.
    Purge,
    /// Error response generated by the worker.
    Error,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_static())
    }
}

/// Writes the cache status header on client responses.
#[derive(Debug, Clone, Default)]
pub struct StatusHeader {
    name: Option<HeaderName>,
}

impl StatusHeader {
    /// Build from the configured header name. An empty or invalid name
    /// disables the header.
    pub fn new(name: &str) -> Self {
        let name = if name.trim().is_empty() {
            None
        } else {
            HeaderName::from_bytes(name.trim().as_bytes()).ok()
        };
        Self { name }
    }

    /// Stamp the status on a response.
    pub fn apply(&self, mut response: EdgeResponse, status: CacheStatus) -> EdgeResponse {
        if let Some(name) = &self.name {
            response
                .headers
                .insert(name.clone(), HeaderValue::from_static(status.as_static()));
        }
        response
    }
}

impl CacheStatus {
    fn as_static(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Stale => "STALE",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
            Self::Purge => "PURGE",
            Self::Error => "ERROR",
        }
    }
}
