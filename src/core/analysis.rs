//! One-request analysis pipeline
//!
//! Acquire, project, measure, attach, aggregate: the orchestration that
//! turns a place name into one plain result record. The result is built
//! fully before being returned; a failed acquisition returns nothing at
//! all, while degraded optional measures surface as neutral columns.

use serde::{Deserialize, Serialize};

use crate::core::acquire::{Coordinator, GraphSource};
use crate::core::centrality::{self, CentralityTable, Measure};
use crate::core::config::Mode;
use crate::core::error::Result;
use crate::core::geocode::Geocoder;
use crate::core::graph::{EdgeRow, Node};
use crate::core::hexbin::{self, HexAggregate};
use crate::core::metrics::{self, MetricsResult};

/// What to compute for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub mode: Mode,
    pub radius_m: u32,
    pub betweenness: bool,
    pub closeness: bool,
    pub degree: bool,
    pub straightness: bool,
    pub eigenvector: bool,
    pub hex: bool,
    pub hex_resolution: u8,
    /// Overrides the coordinator's configured default when set
    pub allow_synthetic: Option<bool>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Walk,
            radius_m: 1000,
            betweenness: true,
            closeness: false,
            degree: false,
            straightness: false,
            eigenvector: false,
            hex: true,
            hex_resolution: 7,
            allow_synthetic: None,
        }
    }
}

impl AnalysisOptions {
    fn measures(&self) -> Vec<Measure> {
        let mut measures = Vec::new();
        if self.degree {
            measures.push(Measure::Degree);
        }
        if self.closeness {
            measures.push(Measure::Closeness);
        }
        if self.straightness {
            measures.push(Measure::Straightness);
        }
        if self.eigenvector {
            measures.push(Measure::Eigenvector);
        }
        if self.betweenness {
            measures.push(Measure::Betweenness);
        }
        measures
    }
}

/// Plain, serialization-ready record of one analysis
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub place: String,
    pub mode: Mode,
    pub radius_m: u32,
    /// Where the graph came from; `synthetic` marks the fallback lattice
    pub source: GraphSource,
    pub metrics: MetricsResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centralities: Option<CentralityTable>,
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<HexAggregate>,
}

/// Run one full analysis through `coordinator`
pub async fn run<G: Geocoder>(
    coordinator: &Coordinator<G>,
    place: &str,
    options: &AnalysisOptions,
) -> Result<AnalysisResult> {
    let acquired = coordinator
        .acquire(place, options.mode, options.radius_m, options.allow_synthetic)
        .await?;
    let graph = acquired.graph.project();

    let metrics = metrics::summary(&graph);

    let measures = options.measures();
    let mut edges = graph.edge_table();
    let centralities = if measures.is_empty() {
        None
    } else {
        let table = centrality::node_centralities(&graph, &measures);
        for &measure in &measures {
            if let Some(values) = table.to_map(measure) {
                centrality::attach(&mut edges, &values, measure);
            }
        }
        Some(table)
    };

    let hex = if options.hex {
        Some(hexbin::aggregate(&graph, options.hex_resolution)?)
    } else {
        None
    };

    Ok(AnalysisResult {
        place: place.to_string(),
        mode: options.mode,
        radius_m: options.radius_m,
        source: acquired.source,
        metrics,
        centralities,
        nodes: graph.nodes,
        edges,
        hex,
    })
}
