//! Inbound request model.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use http::Method;
use url::Url;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:x}", nanos, seq))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error produced while building a request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header {0:?}")]
    InvalidHeader(String),
}

/// An inbound request as observed by the cache layer.
///
/// The cache layer never mutates a request; derived values (cache keys,
/// origin requests) are built from it.
#[derive(Debug, Clone)]
pub struct EdgeRequest {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Full request URL.
    pub url: Url,
    /// Request headers (names are case-insensitive).
    pub headers: HeaderMap,
    /// Request body, forwarded untouched on pass-through.
    pub body: Bytes,
}

impl EdgeRequest {
    /// Create a new request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            request_id: RequestId::generate(),
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Parse a URL string and build a request for it.
    pub fn parse(method: Method, url: &str) -> Result<Self, RequestError> {
        let parsed = Url::parse(url).map_err(|source| RequestError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self::new(method, parsed))
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, RequestError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RequestError::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| RequestError::InvalidHeader(name.as_str().to_string()))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Replace the header map.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a header value by name (case-insensitive).
    ///
    /// Bytes outside UTF-8 are replaced rather than hiding the whole value.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    /// Get a header value, treating an empty value as absent.
    pub fn non_empty_header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.header(name).filter(|v| !v.is_empty())
    }

    /// Iterate over the individual `name=value` cookie entries, trimmed.
    ///
    /// Entries are split on raw bytes so one non-ASCII cookie never hides
    /// its neighbours.
    pub fn cookies(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .flat_map(|v| v.as_bytes().split(|b| *b == b';'))
            .map(|entry| String::from_utf8_lossy(trim_ascii(entry)))
    }

    /// The URL search string including the leading `?`, or empty.
    pub fn search(&self) -> String {
        match self.url.query() {
            Some(q) if !q.is_empty() => format!("?{}", q),
            _ => String::new(),
        }
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Whether the query string carries a parameter with this name.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.url.query_pairs().any(|(k, _)| k == name)
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> EdgeRequest {
        EdgeRequest::parse(Method::GET, url).unwrap()
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = request("https://shop.test/")
            .with_header("User-Agent", "Mozilla/5.0")
            .unwrap();
        assert_eq!(req.header("user-agent").as_deref(), Some("Mozilla/5.0"));
        assert_eq!(req.header("USER-AGENT").as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_empty_header_is_absent() {
        let req = request("https://shop.test/")
            .with_header("Accept-Language", "")
            .unwrap();
        assert_eq!(req.header("accept-language").as_deref(), Some(""));
        assert_eq!(req.non_empty_header("accept-language"), None);
    }

    #[test]
    fn test_cookies_are_split_and_trimmed() {
        let req = request("https://shop.test/")
            .with_header("Cookie", "a=1;  b=2 ;c=3")
            .unwrap();
        let cookies: Vec<_> = req.cookies().collect();
        assert_eq!(cookies, vec!["a=1", "b=2", "c=3"]);
    }

    #[test]
    fn test_non_ascii_cookie_keeps_neighbours() {
        let mut req = request("https://shop.test/");
        req.headers.insert(
            COOKIE,
            HeaderValue::from_bytes("name=José; no_worker_cache=true".as_bytes()).unwrap(),
        );
        let cookies: Vec<_> = req.cookies().collect();
        assert_eq!(cookies, vec!["name=José", "no_worker_cache=true"]);
    }

    #[test]
    fn test_non_ascii_header_is_not_absent() {
        let mut req = request("https://shop.test/");
        req.headers.insert(
            "user-agent",
            HeaderValue::from_bytes("Café iPhone".as_bytes()).unwrap(),
        );
        assert_eq!(req.header("user-agent").as_deref(), Some("Café iPhone"));
        assert!(req.non_empty_header("user-agent").is_some());
    }

    #[test]
    fn test_trim_ascii() {
        assert_eq!(trim_ascii(b"  a=1 "), b"a=1");
        assert_eq!(trim_ascii(b"   "), b"");
        assert_eq!(trim_ascii(b""), b"");
    }

    #[test]
    fn test_search_string() {
        assert_eq!(request("https://shop.test/a?x=1").search(), "?x=1");
        assert_eq!(request("https://shop.test/a").search(), "");
        assert_eq!(request("https://shop.test/a?").search(), "");
    }

    #[test]
    fn test_query_param() {
        let req = request("https://shop.test/a?__purge_cache=abc&x=1");
        assert!(req.has_query_param("__purge_cache"));
        assert_eq!(req.query_param("__purge_cache").as_deref(), Some("abc"));
        assert!(!req.has_query_param("purge"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            EdgeRequest::parse(Method::GET, "not a url"),
            Err(RequestError::InvalidUrl { .. })
        ));
    }
}
