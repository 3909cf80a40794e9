//! Outbound transport for the edge cache worker.
//!
//! This crate provides:
//! - `OriginFetch` / `HttpOrigin` - Pass-through fetch to the origin
//! - `PurgeProvider` / `HttpPurgeProvider` - Cache provider purge API
//! - `ZoneId` - Validated purge zone identifier
//! - `TimeoutConfig` - Transport timeouts

mod client;
mod origin;
mod purge;
mod timeout;

pub use client::*;
pub use origin::*;
pub use purge::*;
pub use timeout::*;
