//! Shared HTTP client plumbing.

use edge_core::{EdgeError, EdgeResponse};
use http::header::{HeaderMap, CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};

use crate::timeout::TimeoutConfig;

/// Error type for fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Body error: {0}")]
    Body(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_body() || err.is_decode() {
            FetchError::Body(err.to_string())
        } else if err.is_builder() {
            FetchError::Client(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

impl From<FetchError> for EdgeError {
    fn from(err: FetchError) -> Self {
        EdgeError::OriginFetchFailure(err.to_string())
    }
}

/// Build a reqwest client honouring the timeouts.
///
/// Redirects are not followed: a redirect from the origin is a response
/// in its own right and may be cached.
pub fn build_http_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.total)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

/// Copy request headers, dropping the ones the transport owns.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in [HOST, CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING] {
        out.remove(name);
    }
    out
}

/// Read a full reqwest response into an `EdgeResponse`.
pub async fn read_response(response: reqwest::Response) -> Result<EdgeResponse, FetchError> {
    let status = response.status();
    let mut headers = response.headers().clone();
    // The body is buffered; framing headers no longer describe it.
    headers.remove(TRANSFER_ENCODING);
    headers.remove(CONNECTION);
    let body = response.bytes().await?;
    Ok(EdgeResponse {
        status,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderValue, USER_AGENT};

    #[test]
    fn test_forwardable_headers_strip_transport_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("shop.test"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8"));
        let out = forwardable_headers(&headers);
        assert!(out.get(HOST).is_none());
        assert!(out.get(CONNECTION).is_none());
        assert_eq!(out.get(USER_AGENT).unwrap(), "curl/8");
    }

    #[test]
    fn test_fetch_error_maps_to_origin_failure() {
        let err: EdgeError = FetchError::Connection("refused".into()).into();
        assert!(matches!(err, EdgeError::OriginFetchFailure(ref d) if d.contains("refused")));
    }

    #[test]
    fn test_build_client() {
        assert!(build_http_client(&TimeoutConfig::default()).is_ok());
    }
}
