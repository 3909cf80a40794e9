//! Observability infrastructure for the edge cache worker.
//!
//! This crate provides:
//! - `init_logging` - Global `tracing` subscriber in JSON or human format
//! - `CacheMetrics` - Process-wide cache outcome counters
//! - `MetricsSnapshot` - Serializable point-in-time view of the counters

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
