//! Freshness policy for stored responses.

use std::time::Duration;

use http::header::{HeaderValue, CACHE_CONTROL, SET_COOKIE};
use serde::{Deserialize, Serialize};

use edge_core::{EdgeResponse, FreshnessConfig};

/// The three freshness directives written into stored responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheControl {
    /// Freshness lifetime.
    pub max_age: u64,
    /// Window after expiry where a stale copy is served while refreshing.
    pub stale_while_revalidate: u64,
    /// Window after expiry where a stale copy is served if refreshing fails.
    pub stale_if_error: u64,
}

impl CacheControl {
    /// Create directives from seconds.
    pub fn new(max_age: u64, stale_while_revalidate: u64, stale_if_error: u64) -> Self {
        Self {
            max_age,
            stale_while_revalidate,
            stale_if_error,
        }
    }

    /// Parse a `Cache-Control` header value.
    ///
    /// Unknown directives are ignored; a missing directive counts as zero.
    pub fn parse(value: &str) -> Self {
        let mut directives = Self::default();
        for part in value.split(',') {
            let mut kv = part.trim().splitn(2, '=');
            let name = kv.next().unwrap_or_default().trim().to_ascii_lowercase();
            let Some(secs) = kv
                .next()
                .and_then(|v| v.trim().trim_matches('"').parse::<u64>().ok())
            else {
                continue;
            };
            match name.as_str() {
                "max-age" => directives.max_age = secs,
                "stale-while-revalidate" => directives.stale_while_revalidate = secs,
                "stale-if-error" => directives.stale_if_error = secs,
                _ => {}
            }
        }
        directives
    }

    /// Classify an entry of the given age.
    pub fn freshness(&self, age: Duration) -> Freshness {
        let age = age.as_secs();
        if age <= self.max_age {
            Freshness::Fresh
        } else if age <= self.max_age.saturating_add(self.stale_while_revalidate) {
            Freshness::StaleWhileRevalidate
        } else if age <= self.max_age.saturating_add(self.stale_if_error) {
            Freshness::StaleIfError
        } else {
            Freshness::Expired
        }
    }

    /// Age after which an entry can never be served again.
    pub fn retention(&self) -> Duration {
        let stale = self.stale_while_revalidate.max(self.stale_if_error);
        Duration::from_secs(self.max_age.saturating_add(stale))
    }
}

impl std::fmt::Display for CacheControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "max-age={}, stale-while-revalidate={}, stale-if-error={}",
            self.max_age, self.stale_while_revalidate, self.stale_if_error
        )
    }
}

/// How a stored entry may be used at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Within max-age.
    Fresh,
    /// Past max-age, within stale-while-revalidate.
    StaleWhileRevalidate,
    /// Past stale-while-revalidate, within stale-if-error. Served only when
    /// the origin fails.
    StaleIfError,
    /// Must not be served.
    Expired,
}

/// An origin response after the freshness policy ran.
#[derive(Debug, Clone)]
pub struct Annotated {
    /// Whether the response may be written to the store.
    pub cacheable: bool,
    /// The response to hand back (decorated when cacheable).
    pub response: EdgeResponse,
}

/// Decides which origin responses are stored and stamps their directives.
#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    directives: CacheControl,
    header_value: HeaderValue,
    statuses: Vec<u16>,
    content_types: Vec<String>,
}

impl FreshnessPolicy {
    /// Create a policy from configuration.
    pub fn new(config: &FreshnessConfig) -> Self {
        let directives = CacheControl::new(
            config.max_age,
            config.stale_while_revalidate,
            config.stale_if_error,
        );
        // Only digits, commas, spaces and ASCII letters.
        let header_value = HeaderValue::from_str(&directives.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("no-store"));
        Self {
            directives,
            header_value,
            statuses: config.cacheable_statuses.clone(),
            content_types: config
                .cacheable_content_types
                .iter()
                .map(|c| c.to_ascii_lowercase())
                .collect(),
        }
    }

    /// The directives written into stored responses.
    pub fn cache_control(&self) -> CacheControl {
        self.directives
    }

    /// Whether the content type names a cacheable document type.
    pub fn is_cacheable_content_type(&self, response: &EdgeResponse) -> bool {
        let Some(content_type) = response.content_type() else {
            return false;
        };
        let content_type = content_type.to_ascii_lowercase();
        self.content_types
            .iter()
            .any(|c| content_type.contains(c.as_str()))
    }

    /// Whether the status is in the allow-list.
    pub fn is_cacheable_status(&self, response: &EdgeResponse) -> bool {
        self.statuses.contains(&response.status.as_u16())
    }

    /// Annotate an origin response.
    ///
    /// Non-matching responses come back untouched and not cacheable. A
    /// cacheable response has every `Set-Cookie` removed and its
    /// `Cache-Control` replaced.
    pub fn annotate(&self, response: EdgeResponse) -> Annotated {
        if !self.is_cacheable_content_type(&response) || !self.is_cacheable_status(&response) {
            return Annotated {
                cacheable: false,
                response,
            };
        }

        let mut response = response;
        response.headers.remove(SET_COOKIE);
        response
            .headers
            .insert(CACHE_CONTROL, self.header_value.clone());

        Annotated {
            cacheable: true,
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn policy() -> FreshnessPolicy {
        FreshnessPolicy::new(&FreshnessConfig::default())
    }

    fn html(status: StatusCode) -> EdgeResponse {
        EdgeResponse::html(status, "<html></html>")
            .with_header(SET_COOKIE, HeaderValue::from_static("session=abc"))
            .with_header(CACHE_CONTROL, HeaderValue::from_static("private, no-cache"))
    }

    #[test]
    fn test_cacheable_html_is_decorated() {
        let mut resp = html(StatusCode::OK);
        resp.headers
            .append(SET_COOKIE, HeaderValue::from_static("cart=1"));
        let annotated = policy().annotate(resp);
        assert!(annotated.cacheable);
        assert!(annotated.response.headers.get(SET_COOKIE).is_none());
        assert_eq!(
            annotated.response.header("cache-control"),
            Some("max-age=300, stale-while-revalidate=45, stale-if-error=3600")
        );
    }

    #[test]
    fn test_status_allow_list() {
        for status in [200, 301, 302, 303, 307, 404] {
            let resp = html(StatusCode::from_u16(status).unwrap());
            assert!(policy().annotate(resp).cacheable, "status {}", status);
        }
        for status in [201, 304, 308, 500, 503] {
            let resp = html(StatusCode::from_u16(status).unwrap());
            let annotated = policy().annotate(resp);
            assert!(!annotated.cacheable, "status {}", status);
            assert_eq!(
                annotated.response.header("set-cookie"),
                Some("session=abc")
            );
        }
    }

    #[test]
    fn test_non_html_untouched() {
        let resp = EdgeResponse::text(StatusCode::OK, "{}")
            .with_header(SET_COOKIE, HeaderValue::from_static("session=abc"));
        let annotated = policy().annotate(resp);
        assert!(!annotated.cacheable);
        assert_eq!(annotated.response.header("set-cookie"), Some("session=abc"));
        assert!(annotated.response.header("cache-control").is_none());
    }

    #[test]
    fn test_missing_content_type_not_cacheable() {
        let resp = EdgeResponse::new(StatusCode::OK);
        assert!(!policy().annotate(resp).cacheable);
    }

    #[test]
    fn test_content_type_case_insensitive() {
        let resp = EdgeResponse::new(StatusCode::OK).with_header(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("Text/HTML; charset=UTF-8"),
        );
        assert!(policy().annotate(resp).cacheable);
    }

    #[test]
    fn test_parse_cache_control() {
        let cc = CacheControl::parse("public, max-age=300, stale-while-revalidate=45, stale-if-error=3600");
        assert_eq!(cc, CacheControl::new(300, 45, 3600));
        assert_eq!(CacheControl::parse("no-store"), CacheControl::default());
        assert_eq!(CacheControl::parse("MAX-AGE=\"10\"").max_age, 10);
    }

    #[test]
    fn test_parse_renders_back() {
        let cc = policy().cache_control();
        assert_eq!(CacheControl::parse(&cc.to_string()), cc);
    }

    #[test]
    fn test_freshness_windows() {
        let cc = CacheControl::new(300, 45, 3600);
        assert_eq!(cc.freshness(Duration::from_secs(0)), Freshness::Fresh);
        assert_eq!(cc.freshness(Duration::from_secs(300)), Freshness::Fresh);
        assert_eq!(
            cc.freshness(Duration::from_secs(301)),
            Freshness::StaleWhileRevalidate
        );
        assert_eq!(
            cc.freshness(Duration::from_secs(345)),
            Freshness::StaleWhileRevalidate
        );
        assert_eq!(cc.freshness(Duration::from_secs(346)), Freshness::StaleIfError);
        assert_eq!(cc.freshness(Duration::from_secs(3900)), Freshness::StaleIfError);
        assert_eq!(cc.freshness(Duration::from_secs(3901)), Freshness::Expired);
        assert_eq!(cc.retention(), Duration::from_secs(3900));
    }

    #[test]
    fn test_swr_wider_than_sie() {
        let cc = CacheControl::new(10, 100, 20);
        assert_eq!(
            cc.freshness(Duration::from_secs(50)),
            Freshness::StaleWhileRevalidate
        );
        assert_eq!(cc.freshness(Duration::from_secs(111)), Freshness::Expired);
        assert_eq!(cc.retention(), Duration::from_secs(110));
    }
}
