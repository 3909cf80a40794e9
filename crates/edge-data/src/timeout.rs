//! Timeout configuration for outbound requests.

use std::time::Duration;

use edge_core::OriginConfig;

/// Timeout configuration for a fetch operation.
///
/// The cache layer itself never times out an origin fetch; these limits
/// are enforced by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Connection timeout.
    pub connect: Duration,
    /// Total operation timeout.
    pub total: Duration,
}

impl TimeoutConfig {
    /// Create a new timeout configuration.
    pub fn new(connect: Duration, total: Duration) -> Self {
        Self { connect, total }
    }

    /// Create from origin configuration.
    pub fn from_config(config: &OriginConfig) -> Self {
        Self {
            connect: Duration::from_millis(config.connect_timeout_ms),
            total: Duration::from_millis(config.total_timeout_ms),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::from_config(&OriginConfig::default())
    }
}
