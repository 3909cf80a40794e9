//! Core abstractions for the edge cache worker.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `EdgeRequest` / `EdgeResponse` - The inbound request and outbound response model
//! - `RequestId` - Correlation id carried through logs
//! - `EdgeCacheConfig` - Immutable, process-wide configuration
//! - `EdgeError` - Boundary error type mapped to safe client responses

mod config;
mod context;
mod error;
mod response;

pub use config::*;
pub use context::*;
pub use error::*;
pub use response::*;
