//! # Streetgauge Library
//!
//! Fetches the street network around a place and computes structural
//! accessibility indicators: summary topology statistics, centrality
//! measures, and a hexagonal aggregation of network length.
//!
//! ## Features
//!
//! - **Resilient acquisition**: ordered endpoint failover over any number
//!   of Overpass instances, with response caching and graph snapshots
//! - **Deterministic fallback**: a synthetic lattice when every remote
//!   source is down, so pipelines stay testable offline
//! - **Centrality engine**: sampled betweenness, Wasserman-Faust
//!   closeness, straightness and eigenvector centrality over a typed
//!   street graph
//! - **Hexagonal binning**: edge length summed into the global H3 grid at
//!   any resolution
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use streetgauge::{AcquireConfig, AnalysisOptions, Coordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Coordinator::new(AcquireConfig::default())?;
//!     let options = AnalysisOptions {
//!         radius_m: 1500,
//!         ..Default::default()
//!     };
//!
//!     let result = streetgauge::analyze(&coordinator, "Lyon, France", &options).await?;
//!     println!("{} nodes, {:.1} km", result.metrics.nodes, result.metrics.total_km);
//!     Ok(())
//! }
//! ```
//!
//! ## Offline Fallback
//!
//! ```rust,no_run
//! use streetgauge::{AcquireConfig, AnalysisOptions, Coordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Coordinator::new(AcquireConfig::default())?;
//!     let options = AnalysisOptions {
//!         // coordinates skip geocoding; the lattice covers total outages
//!         allow_synthetic: Some(true),
//!         ..Default::default()
//!     };
//!     let result = streetgauge::analyze(&coordinator, "45.764, 4.8357", &options).await?;
//!     assert!(result.metrics.nodes > 0);
//!     Ok(())
//! }
//! ```

// Re-export the public surface
pub use crate::core::acquire::{Acquisition, Coordinator, GraphSource};
pub use crate::core::analysis::{AnalysisOptions, AnalysisResult};
pub use crate::core::centrality::{attach, betweenness, node_centralities, CentralityTable, Measure};
pub use crate::core::config::{AcquireConfig, Mode, DEFAULT_ENDPOINTS, DEFAULT_TIMEOUT_SECS};
pub use crate::core::error::{EndpointFailure, Error, Result};
pub use crate::core::failover::FailoverState;
pub use crate::core::geocode::{Geocoder, NominatimGeocoder, StaticGeocoder};
pub use crate::core::graph::{Crs, Edge, EdgeRow, Node, StreetGraph};
pub use crate::core::hexbin::{aggregate, HexAggregate, HexCell};
pub use crate::core::metrics::{summary, MetricsResult};
pub use crate::core::synthetic::synthetic;

// Internal modules
pub mod core;

/// Run one full analysis: acquire the network around `place`, compute the
/// summary metrics and requested centralities, and aggregate into hexagons.
///
/// This is the library's main entry point; the pieces are available
/// individually through [`Coordinator::acquire`], [`summary`],
/// [`node_centralities`], [`betweenness`] and [`aggregate`] when a caller
/// needs only part of the pipeline.
pub async fn analyze<G: Geocoder>(
    coordinator: &Coordinator<G>,
    place: &str,
    options: &AnalysisOptions,
) -> Result<AnalysisResult> {
    core::analysis::run(coordinator, place, options).await
}
