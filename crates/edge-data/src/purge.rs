//! Cache provider purge collaborator.

use async_trait::async_trait;
use http::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use edge_core::{EdgeResponse, PurgeConfig};

use crate::client::{build_http_client, read_response, FetchError};
use crate::timeout::TimeoutConfig;

/// Length of a provider zone identifier.
pub const ZONE_ID_LEN: usize = 32;

/// A validated purge zone identifier: exactly 32 characters of `[a-z0-9]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneId(String);

impl ZoneId {
    /// Validate a raw zone identifier.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == ZONE_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        valid.then(|| Self(raw.to_string()))
    }

    /// The identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body sent to the provider.
#[derive(Debug, Serialize)]
pub struct PurgeEverything {
    pub purge_everything: bool,
}

impl PurgeEverything {
    /// The serialized `{"purge_everything":true}` body.
    pub fn body() -> Vec<u8> {
        serde_json::to_vec(&PurgeEverything {
            purge_everything: true,
        })
        .unwrap_or_else(|_| br#"{"purge_everything":true}"#.to_vec())
    }
}

/// Normalise a caller credential into an `Authorization` value.
///
/// Values already carrying the `Bearer` scheme are kept as-is.
pub fn bearer_value(credential: &str) -> String {
    let trimmed = credential.trim();
    let has_scheme = trimmed
        .get(..7)
        .is_some_and(|p| p.eq_ignore_ascii_case("bearer "));
    if has_scheme {
        trimmed.to_string()
    } else {
        format!("Bearer {}", trimmed)
    }
}

/// The cache provider's "purge everything" operation.
#[async_trait]
pub trait PurgeProvider: Send + Sync {
    /// Purge every cached entry of a zone. The provider's answer is
    /// returned as-is; only transport failures are errors.
    async fn purge_everything(
        &self,
        zone: &ZoneId,
        credential: Option<&str>,
    ) -> Result<EdgeResponse, FetchError>;
}

/// Purge provider speaking the zone purge HTTP API.
#[derive(Debug, Clone)]
pub struct HttpPurgeProvider {
    client: reqwest::Client,
    api_base: String,
}

impl HttpPurgeProvider {
    /// Create from configuration.
    pub fn new(config: &PurgeConfig, timeouts: &TimeoutConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(timeouts)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint for a zone.
    pub fn endpoint(&self, zone: &ZoneId) -> String {
        format!("{}/zones/{}/purge_cache", self.api_base, zone)
    }
}

#[async_trait]
impl PurgeProvider for HttpPurgeProvider {
    async fn purge_everything(
        &self,
        zone: &ZoneId,
        credential: Option<&str>,
    ) -> Result<EdgeResponse, FetchError> {
        let mut request = self
            .client
            .post(self.endpoint(zone))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(PurgeEverything::body());

        if let Some(credential) = credential {
            request = request.header(AUTHORIZATION, bearer_value(credential));
        }

        let response = request.send().await?;
        tracing::info!(%zone, status = response.status().as_u16(), "purge request answered");
        read_response(response).await
    }
}
