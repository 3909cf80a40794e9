//! Purge entry point.

use std::sync::Arc;

use http::header::AUTHORIZATION;

use edge_cache::CacheStore;
use edge_core::{EdgeError, EdgeRequest, EdgeResponse, PurgeConfig};
use edge_data::{PurgeProvider, ZoneId};

/// Validates purge triggers and relays them to the provider.
///
/// Never touches key derivation or freshness.
pub struct PurgeHandler {
    provider: Arc<dyn PurgeProvider>,
    store: Arc<dyn CacheStore>,
    query_param: String,
}

impl PurgeHandler {
    pub fn new(
        config: &PurgeConfig,
        provider: Arc<dyn PurgeProvider>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            provider,
            store,
            query_param: config.query_param.clone(),
        }
    }

    /// Handle a purge trigger.
    ///
    /// An invalid zone id fails before any outbound call. The provider's
    /// status, headers and body are relayed unchanged; a 2xx answer also
    /// clears the local store.
    pub async fn purge(&self, request: &EdgeRequest) -> Result<EdgeResponse, EdgeError> {
        let raw = request.query_param(&self.query_param).unwrap_or_default();
        let zone = ZoneId::parse(&raw).ok_or(EdgeError::InvalidPurgeZone(raw))?;
        let credential = request.non_empty_header(AUTHORIZATION.as_str());

        let response = self.provider.purge_everything(&zone, credential.as_deref()).await?;

        if response.status.is_success() {
            match self.store.purge_all().await {
                Ok(removed) => {
                    tracing::info!(request_id = %request.request_id, %zone, removed, "zone purged")
                }
                Err(err) => tracing::warn!(
                    request_id = %request.request_id,
                    %zone,
                    error = %err,
                    "provider purged but local store could not be cleared"
                ),
            }
        } else {
            tracing::warn!(
                request_id = %request.request_id,
                %zone,
                status = response.status.as_u16(),
                "provider rejected purge"
            );
        }

        Ok(response)
    }
}
