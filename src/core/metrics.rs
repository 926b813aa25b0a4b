//! Summary topology statistics
//!
//! Scalar indicators over one street graph. Components and path lengths are
//! computed on the undirected projection; an empty graph short-circuits to
//! all-zero values rather than dividing by zero.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::core::centrality::dijkstra;
use crate::core::graph::StreetGraph;

/// Scalar summary of one analysis, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub nodes: usize,
    pub edges: usize,
    pub total_km: f64,
    pub components: usize,
    pub largest_component_nodes: usize,
    pub avg_degree: f64,
    pub avg_shortest_path_m: f64,
}

impl MetricsResult {
    fn zero() -> Self {
        Self {
            nodes: 0,
            edges: 0,
            total_km: 0.0,
            components: 0,
            largest_component_nodes: 0,
            avg_degree: 0.0,
            avg_shortest_path_m: 0.0,
        }
    }

    /// Name → value view for callers that render indicator tables
    pub fn as_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("nodes", self.nodes as f64),
            ("edges", self.edges as f64),
            ("total_km", self.total_km),
            ("components", self.components as f64),
            (
                "largest_component_nodes",
                self.largest_component_nodes as f64,
            ),
            ("avg_degree", self.avg_degree),
            ("avg_shortest_path_m", self.avg_shortest_path_m),
        ])
    }
}

/// Compute the summary statistics for `graph`
pub fn summary(graph: &StreetGraph) -> MetricsResult {
    let n = graph.node_count();
    if n == 0 {
        return MetricsResult::zero();
    }

    let view = graph.undirected_view();

    // component count and sizes by BFS over the undirected projection
    let mut visited = vec![false; n];
    let mut components = 0usize;
    let mut largest = 0usize;
    for start in 0..n {
        if visited[start] {
            continue;
        }
        components += 1;
        let mut size = 0usize;
        let mut queue = std::collections::VecDeque::from([start]);
        visited[start] = true;
        while let Some(at) = queue.pop_front() {
            size += 1;
            for neighbor in view.neighbors(NodeIndex::new(at)) {
                if !visited[neighbor.index()] {
                    visited[neighbor.index()] = true;
                    queue.push_back(neighbor.index());
                }
            }
        }
        largest = largest.max(size);
    }

    let avg_degree = 2.0 * view.edge_count() as f64 / n as f64;

    // mean over all ordered reachable pairs, pooled across components
    let mut path_sum = 0.0;
    let mut path_pairs = 0u64;
    if view.edge_count() > 0 {
        for source in 0..n {
            let dist = dijkstra(&view, NodeIndex::new(source));
            for (target, d) in dist.iter().enumerate() {
                if target != source && d.is_finite() {
                    path_sum += d;
                    path_pairs += 1;
                }
            }
        }
    }
    let avg_shortest_path_m = if path_pairs > 0 {
        path_sum / path_pairs as f64
    } else {
        0.0
    };

    MetricsResult {
        nodes: n,
        edges: graph.edge_count(),
        total_km: graph.total_length_m() / 1000.0,
        components,
        largest_component_nodes: largest,
        avg_degree,
        avg_shortest_path_m,
    }
}
