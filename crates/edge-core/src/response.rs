//! Outbound response model.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;

/// A response produced by the origin, the cache, or the worker itself.
///
/// Cloning is cheap: the body is reference counted, so one decorated
/// response can be handed to the client and written to the store.
#[derive(Debug, Clone)]
pub struct EdgeResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl EdgeResponse {
    /// Create an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a `text/plain` response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut response = Self::new(status).with_body(body.into());
        response.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    /// Create a `text/html` response.
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        let mut response = Self::new(status).with_body(body.into());
        response.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        response
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header, replacing any existing values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body as UTF-8 text (lossy).
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response() {
        let resp = EdgeResponse::text(StatusCode::BAD_REQUEST, "Invalid Zone ID");
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body_text(), "Invalid Zone ID");
        assert!(resp.content_type().unwrap().starts_with("text/plain"));
    }

    #[test]
    fn test_clone_shares_body() {
        let resp = EdgeResponse::html(StatusCode::OK, "<p>hi</p>");
        let copy = resp.clone();
        assert_eq!(resp.body.as_ptr(), copy.body.as_ptr());
    }
}
