//! Boundary error type for request handling.

use http::StatusCode;

use crate::response::EdgeResponse;

/// Errors surfaced to the caller of the worker.
///
/// The carried detail is for logs only. Clients receive the fixed
/// message from [`EdgeError::public_message`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum EdgeError {
    /// The purge zone identifier is malformed. No outbound call was made.
    #[error("invalid purge zone id: {0:?}")]
    InvalidPurgeZone(String),

    /// The origin or the purge provider could not be reached.
    #[error("origin fetch failed: {0}")]
    OriginFetchFailure(String),

    /// Anything else that went wrong while handling the request.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl EdgeError {
    /// Status code sent to the client.
    ///
    /// With `legacy` set every error maps to 500, matching deployments that
    /// depend on the historical behaviour.
    pub fn status(&self, legacy: bool) -> StatusCode {
        if legacy {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::InvalidPurgeZone(_) => StatusCode::BAD_REQUEST,
            Self::OriginFetchFailure(_) => StatusCode::BAD_GATEWAY,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Generic message safe to show to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidPurgeZone(_) => "Invalid Zone ID",
            Self::OriginFetchFailure(_) => "Origin unavailable",
            Self::InternalError(_) => "Internal error",
        }
    }

    /// Short machine-readable kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPurgeZone(_) => "invalid_purge_zone",
            Self::OriginFetchFailure(_) => "origin_fetch_failure",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Convert into the response sent to the client.
    pub fn into_response(&self, legacy: bool) -> EdgeResponse {
        EdgeResponse::text(self.status(legacy), self.public_message())
    }
}
