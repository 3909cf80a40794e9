//! Origin fetch collaborator.

use async_trait::async_trait;
use url::Url;

use edge_core::{EdgeRequest, EdgeResponse, OriginConfig};

use crate::client::{build_http_client, forwardable_headers, read_response, FetchError};
use crate::timeout::TimeoutConfig;

/// Pass-through fetch of a request from the origin.
///
/// Implementations own timeouts; callers never retry.
#[async_trait]
pub trait OriginFetch: Send + Sync {
    /// Fetch the origin response for a request.
    async fn fetch(&self, request: &EdgeRequest) -> Result<EdgeResponse, FetchError>;
}

/// Origin fetch over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: reqwest::Client,
    base: Option<Url>,
}

impl HttpOrigin {
    /// Create an origin client from configuration.
    pub fn new(config: &OriginConfig) -> Result<Self, FetchError> {
        let base = config
            .url
            .as_deref()
            .map(|u| Url::parse(u).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", u, e))))
            .transpose()?;
        let client = build_http_client(&TimeoutConfig::from_config(config))?;
        Ok(Self { client, base })
    }

    /// The URL actually fetched for a request.
    pub fn target_url(&self, request: &EdgeRequest) -> Result<Url, FetchError> {
        let Some(base) = &self.base else {
            return Ok(request.url.clone());
        };

        let mut url = request.url.clone();
        url.set_scheme(base.scheme())
            .map_err(|_| FetchError::InvalidUrl(format!("cannot use scheme {}", base.scheme())))?;
        url.set_host(base.host_str())
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        url.set_port(base.port())
            .map_err(|_| FetchError::InvalidUrl(format!("cannot set port on {}", url)))?;
        url.set_fragment(None);
        Ok(url)
    }
}

#[async_trait]
impl OriginFetch for HttpOrigin {
    async fn fetch(&self, request: &EdgeRequest) -> Result<EdgeResponse, FetchError> {
        let url = self.target_url(request)?;
        tracing::debug!(
            request_id = %request.request_id,
            method = %request.method,
            %url,
            "fetching from origin"
        );

        let response = self
            .client
            .request(request.method.clone(), url)
            .headers(forwardable_headers(&request.headers))
            .body(request.body.clone())
            .send()
            .await?;

        read_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_target_url_passthrough() {
        let origin = HttpOrigin::new(&OriginConfig::default()).unwrap();
        let req = EdgeRequest::parse(Method::GET, "https://shop.test/a?x=1").unwrap();
        assert_eq!(origin.target_url(&req).unwrap().as_str(), "https://shop.test/a?x=1");
    }

    #[test]
    fn test_target_url_rewrites_authority() {
        let config = OriginConfig {
            url: Some("http://10.0.0.5:8080".to_string()),
            ..OriginConfig::default()
        };
        let origin = HttpOrigin::new(&config).unwrap();
        let req = EdgeRequest::parse(Method::GET, "https://shop.test/a?x=1#frag").unwrap();
        assert_eq!(
            origin.target_url(&req).unwrap().as_str(),
            "http://10.0.0.5:8080/a?x=1"
        );
    }

    #[test]
    fn test_invalid_origin_url() {
        let config = OriginConfig {
            url: Some("::not a url".to_string()),
            ..OriginConfig::default()
        };
        assert!(matches!(
            HttpOrigin::new(&config),
            Err(FetchError::InvalidUrl(_))
        ));
    }
}
