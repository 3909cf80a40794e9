//! Request entry point for the edge cache worker.
//!
//! This crate wires the cache engine to its collaborators:
//! - `EdgeWorker` - The single request-handling entry point and error boundary
//! - `Route` / `Router` - Purge, bypass or cache path for a request
//! - `PurgeHandler` - Zone validation and relay to the purge provider
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_core::EdgeCacheConfig;
//! use edge_worker::EdgeWorker;
//!
//! let config = Arc::new(EdgeCacheConfig::load("edge-cache.toml")?);
//! let worker = EdgeWorker::from_config(config)?;
//!
//! let response = worker.handle(request).await;
//! worker.shutdown(Duration::from_secs(5)).await;
//! ```

mod error;
mod purge;
mod route;
mod worker;

pub use error::*;
pub use purge::*;
pub use route::*;
pub use worker::*;
