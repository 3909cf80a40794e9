//! Cache decision engine for the edge cache worker.
//!
//! This crate provides:
//! - `KeyNormalizer` - Canonical cache keys with tracking parameters removed
//! - `BypassEvaluator` - Requests that must skip caching entirely
//! - `FreshnessPolicy` - Which origin responses are stored, and their directives
//! - `CacheStore` / `InMemoryStore` - Cache store collaborator
//! - `CacheOrchestrator` - Lookup racing a refresh-ahead origin fetch
//! - `StatusHeader` - Cache status reporting on client responses
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::{CacheOrchestrator, InMemoryStore};
//! use edge_core::EdgeCacheConfig;
//! use edge_data::HttpOrigin;
//!
//! let config = EdgeCacheConfig::default();
//! let origin = Arc::new(HttpOrigin::new(&config.origin)?);
//! let orchestrator = CacheOrchestrator::new(&config, Arc::new(InMemoryStore::new()), origin)?;
//!
//! let response = orchestrator.handle(&request).await?;
//! orchestrator.tasks().drain().await;
//! ```

mod bypass;
mod error;
mod headers;
mod key;
mod orchestrator;
mod policy;
mod store;

pub use bypass::*;
pub use error::*;
pub use headers::*;
pub use key::*;
pub use orchestrator::*;
pub use policy::*;
pub use store::*;
