//! Background execution for the edge cache worker.
//!
//! This crate provides:
//! - `BackgroundTasks` - Work that keeps running after the response is sent,
//!   drained on shutdown

mod background;

pub use background::*;
