//! Core library modules for streetgauge
//!
//! This module contains the internal implementation details of the
//! streetgauge library.

pub mod acquire;
pub mod analysis;
pub mod centrality;
pub mod config;
pub mod error;
pub mod failover;
pub mod geocode;
pub mod graph;
pub mod hexbin;
pub mod metrics;
pub mod overpass;
pub mod synthetic;

// Re-export main types for internal use
pub use acquire::{Acquisition, Coordinator, GraphSource};
pub use config::{AcquireConfig, Mode};
