//! Node and edge centrality measures
//!
//! Betweenness uses Brandes' accumulation over a seeded pivot sample, so
//! the same graph always yields the same result. The remaining measures are
//! selected explicitly through `Measure`; a measure that cannot be computed
//! (eigenvector non-convergence) degrades to a zero column instead of
//! aborting the batch.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::seq::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::core::graph::{EdgeRow, StreetGraph};

/// Fixed pivot-sampling seed; reproducibility is part of the contract
const PIVOT_SEED: u64 = 0x5747_4155;

/// Pivot count for sampled betweenness: n/15 clamped to [30, 300]
fn pivot_count(n: usize) -> usize {
    (n / 15).clamp(30, 300).min(n)
}

/// Relative tolerance when deciding that two path lengths tie
const PATH_EPS: f64 = 1e-9;

/// A requested centrality measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Degree,
    Closeness,
    Straightness,
    Eigenvector,
    Betweenness,
}

/// One column per requested measure, indexed like `ids`; a measure that was
/// not requested stays `None` rather than appearing as a zero column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CentralityTable {
    pub ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closeness: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub straightness: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eigenvector: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub betweenness: Option<Vec<f64>>,
}

impl CentralityTable {
    pub fn column(&self, measure: Measure) -> Option<&[f64]> {
        match measure {
            Measure::Degree => self.degree.as_deref(),
            Measure::Closeness => self.closeness.as_deref(),
            Measure::Straightness => self.straightness.as_deref(),
            Measure::Eigenvector => self.eigenvector.as_deref(),
            Measure::Betweenness => self.betweenness.as_deref(),
        }
    }

    /// Node id → value mapping for one measure, if it was computed
    pub fn to_map(&self, measure: Measure) -> Option<HashMap<i64, f64>> {
        let column = self.column(measure)?;
        Some(self.ids.iter().copied().zip(column.iter().copied()).collect())
    }
}

/// Min-heap entry for weighted searches
struct HeapItem {
    dist: f64,
    node: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.node == other.node
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so BinaryHeap pops the smallest distance first
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Single-source weighted shortest-path distances; unreachable nodes stay
/// at infinity
pub(crate) fn dijkstra(view: &UnGraph<usize, f64>, source: NodeIndex) -> Vec<f64> {
    let n = view.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    dist[source.index()] = 0.0;
    heap.push(HeapItem {
        dist: 0.0,
        node: source.index(),
    });

    while let Some(HeapItem { dist: d, node }) = heap.pop() {
        if settled[node] {
            continue;
        }
        settled[node] = true;
        for edge in view.edges(NodeIndex::new(node)) {
            let next = edge.target().index();
            let nd = d + *edge.weight();
            if nd < dist[next] {
                dist[next] = nd;
                heap.push(HeapItem {
                    dist: nd,
                    node: next,
                });
            }
        }
    }
    dist
}

/// One Brandes source pass: shortest-path counting then dependency
/// accumulation in reverse settle order
fn brandes_accumulate(view: &UnGraph<usize, f64>, source: usize, bc: &mut [f64]) {
    let n = view.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut sigma = vec![0.0f64; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut settled = vec![false; n];
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut heap = BinaryHeap::new();

    dist[source] = 0.0;
    sigma[source] = 1.0;
    heap.push(HeapItem {
        dist: 0.0,
        node: source,
    });

    while let Some(HeapItem { dist: d, node }) = heap.pop() {
        if settled[node] {
            continue;
        }
        settled[node] = true;
        order.push(node);

        for edge in view.edges(NodeIndex::new(node)) {
            let next = edge.target().index();
            if settled[next] {
                continue;
            }
            let nd = d + *edge.weight();
            if dist[next].is_infinite() {
                dist[next] = nd;
                sigma[next] = sigma[node];
                preds[next].push(node);
                heap.push(HeapItem {
                    dist: nd,
                    node: next,
                });
                continue;
            }
            let tolerance = PATH_EPS * dist[next].max(1.0);
            if nd < dist[next] - tolerance {
                dist[next] = nd;
                sigma[next] = sigma[node];
                preds[next].clear();
                preds[next].push(node);
                heap.push(HeapItem {
                    dist: nd,
                    node: next,
                });
            } else if (nd - dist[next]).abs() <= tolerance {
                sigma[next] += sigma[node];
                preds[next].push(node);
            }
        }
    }

    let mut delta = vec![0.0f64; n];
    for &w in order.iter().rev() {
        for &v in &preds[w] {
            if sigma[w] > 0.0 {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
        }
        if w != source {
            bc[w] += delta[w];
        }
    }
}

/// Betweenness values indexed by node arena position
fn betweenness_values(graph: &StreetGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut bc = vec![0.0; n];
    if n < 3 {
        return bc;
    }
    let view = graph.undirected_view();
    if view.edge_count() == 0 {
        return bc;
    }

    let k = pivot_count(n);
    let pivots: Vec<usize> = if k >= n {
        (0..n).collect()
    } else {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(PIVOT_SEED);
        indices.shuffle(&mut rng);
        indices.truncate(k);
        indices
    };

    for &source in &pivots {
        brandes_accumulate(&view, source, &mut bc);
    }

    let scale = (n as f64 / pivots.len() as f64) / (((n - 1) * (n - 2)) as f64);
    for value in &mut bc {
        *value = (*value * scale).clamp(0.0, 1.0);
    }
    bc
}

/// Sampled betweenness centrality per node id, each value in [0, 1]
pub fn betweenness(graph: &StreetGraph) -> HashMap<i64, f64> {
    let values = betweenness_values(graph);
    graph
        .nodes
        .iter()
        .map(|node| node.id)
        .zip(values)
        .collect()
}

/// Length-weighted eigenvector centrality via power iteration; `None` on
/// non-convergence
fn eigenvector_values(view: &UnGraph<usize, f64>) -> Option<Vec<f64>> {
    let n = view.node_count();
    if n == 0 {
        return Some(Vec::new());
    }

    let mut x = vec![1.0 / (n as f64).sqrt(); n];
    for _ in 0..100 {
        let mut next = vec![0.0f64; n];
        for edge in view.edge_references() {
            let a = edge.source().index();
            let b = edge.target().index();
            let w = *edge.weight();
            next[a] += w * x[b];
            next[b] += w * x[a];
        }

        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if !norm.is_finite() || norm < 1e-12 {
            return None;
        }
        for value in &mut next {
            *value /= norm;
        }

        let delta: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        x = next;
        if delta < n as f64 * 1e-6 {
            let max = x.iter().copied().fold(0.0f64, f64::max);
            if max > 0.0 {
                for value in &mut x {
                    *value = (*value / max).max(0.0);
                }
            }
            return Some(x);
        }
    }
    None
}

/// Compute the requested node centralities. Measures are independently
/// fault-isolated: one degraded column never aborts the others.
pub fn node_centralities(graph: &StreetGraph, measures: &[Measure]) -> CentralityTable {
    let n = graph.node_count();
    let view = graph.undirected_view();
    let mut table = CentralityTable {
        ids: graph.nodes.iter().map(|node| node.id).collect(),
        ..Default::default()
    };

    if measures.contains(&Measure::Degree) {
        let degree = (0..n)
            .map(|i| view.edges(NodeIndex::new(i)).count() as f64)
            .collect();
        table.degree = Some(degree);
    }

    let wants_paths =
        measures.contains(&Measure::Closeness) || measures.contains(&Measure::Straightness);
    if wants_paths {
        let mut closeness = vec![0.0; n];
        let mut straightness = vec![0.0; n];
        for i in 0..n {
            let dist = dijkstra(&view, NodeIndex::new(i));

            let mut reachable = 0usize;
            let mut dist_sum = 0.0;
            let mut ratio_sum = 0.0;
            let mut ratio_count = 0usize;
            for (j, d) in dist.iter().enumerate() {
                if !d.is_finite() {
                    continue;
                }
                reachable += 1;
                if j == i {
                    continue;
                }
                dist_sum += d;
                if *d > 0.0 {
                    let ratio = graph.straight_line_distance(i, j) / d;
                    if ratio.is_finite() {
                        ratio_sum += ratio;
                        ratio_count += 1;
                    }
                }
            }

            // Wasserman-Faust closeness normalizes by the reachable set,
            // so disconnected graphs stay comparable
            if n > 1 && reachable > 1 && dist_sum > 0.0 {
                let r = (reachable - 1) as f64;
                closeness[i] = (r / (n - 1) as f64) * (r / dist_sum);
            }
            if ratio_count > 0 {
                straightness[i] = ratio_sum / ratio_count as f64;
            }
        }
        if measures.contains(&Measure::Closeness) {
            table.closeness = Some(closeness);
        }
        if measures.contains(&Measure::Straightness) {
            table.straightness = Some(straightness);
        }
    }

    if measures.contains(&Measure::Eigenvector) {
        table.eigenvector = match eigenvector_values(&view) {
            Some(values) => Some(values),
            None => {
                log::warn!("eigenvector centrality did not converge; reporting zeros");
                Some(vec![0.0; n])
            }
        };
    }

    if measures.contains(&Measure::Betweenness) {
        table.betweenness = Some(betweenness_values(graph));
    }

    table
}

/// Attach a node-level column onto the edge table: each edge takes the mean
/// of its endpoints' values. An edge whose endpoint is missing from
/// `values` keeps that column absent rather than zero.
pub fn attach(rows: &mut [EdgeRow], values: &HashMap<i64, f64>, measure: Measure) {
    for row in rows.iter_mut() {
        let merged = match (values.get(&row.u), values.get(&row.v)) {
            (Some(a), Some(b)) => Some((a + b) / 2.0),
            _ => None,
        };
        if merged.is_none() {
            continue;
        }
        match measure {
            Measure::Degree => row.degree = merged,
            Measure::Closeness => row.closeness = merged,
            Measure::Straightness => row.straightness = merged,
            Measure::Eigenvector => row.eigenvector = merged,
            Measure::Betweenness => row.betweenness = merged,
        }
    }
}
