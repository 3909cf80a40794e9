//! Worker construction errors.

use edge_cache::CacheError;
use edge_core::ConfigError;
use edge_data::FetchError;

/// Errors raised while building a worker. Request handling itself never
/// fails; see [`crate::EdgeWorker::handle`].
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("transport setup failed: {0}")]
    Transport(#[from] FetchError),
}
