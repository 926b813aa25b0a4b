//! Street graph model
//!
//! An arena-with-index multigraph: a node array and an edge array that
//! references node positions, with a declared coordinate frame. Built once
//! per acquisition and never mutated across requests; every derived artifact
//! (metrics, centralities, hex bins) reads from it without back-references.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use geo::{Distance, Haversine, Point};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::error::{Error, Result};

/// Meters per degree of latitude under the local equirectangular
/// approximation
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Great-circle distance in meters between two (lat, lon) points
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let p1 = Point::new(lon1, lat1);
    let p2 = Point::new(lon2, lat2);
    Haversine::distance(p1, p2)
}

/// Coordinate reference of a graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Crs {
    /// Plain WGS84 latitude/longitude
    Geographic,

    /// Local planar meters frame anchored at (lat0, lon0)
    LocalMeters { lat0: f64, lon0: f64 },
}

/// Graph node: an intersection or way endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier from the source data (or lattice coordinates)
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    /// Projected easting in meters, filled by `project`
    pub x: Option<f64>,
    /// Projected northing in meters, filled by `project`
    pub y: Option<f64>,
}

impl Node {
    pub fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            x: None,
            y: None,
        }
    }
}

/// Directed road segment between two node arena positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Arena index of the source node
    pub u: usize,
    /// Arena index of the target node
    pub v: usize,
    /// Discriminator between parallel edges of the same (u, v) pair
    pub key: u32,
    /// Segment length in meters
    pub length_m: f64,
    /// Intermediate geometry as (lat, lon) pairs, endpoints included
    pub geometry: Vec<(f64, f64)>,
    /// OSM highway class
    pub highway: Option<String>,
    /// Road name
    pub name: Option<String>,
    /// Whether the source way was one-way
    pub oneway: bool,
}

/// The street network: nodes, edges and their shared coordinate frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub crs: Crs,
}

/// One row of the serialization-ready edge table, with centrality columns
/// attached on request. Absent columns stay absent rather than zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRow {
    /// Source node identifier
    pub u: i64,
    /// Target node identifier
    pub v: i64,
    pub key: u32,
    pub length_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub geometry: Vec<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closeness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub straightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eigenvector: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub betweenness: Option<f64>,
}

impl StreetGraph {
    /// Build a geographic graph, validating the arena invariants: every
    /// edge endpoint must exist and lengths must be finite and non-negative
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        for edge in &edges {
            if edge.u >= nodes.len() || edge.v >= nodes.len() {
                return Err(Error::InvalidInput(format!(
                    "edge ({}, {}) references a node outside the arena of {}",
                    edge.u,
                    edge.v,
                    nodes.len()
                )));
            }
            if !edge.length_m.is_finite() || edge.length_m < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "edge ({}, {}) has invalid length {}",
                    edge.u, edge.v, edge.length_m
                )));
            }
        }
        Ok(Self {
            nodes,
            edges,
            crs: Crs::Geographic,
        })
    }

    /// An empty geographic graph
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            crs: Crs::Geographic,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.edges.is_empty()
    }

    /// Sum of edge lengths in meters; edges without a usable length count 0
    pub fn total_length_m(&self) -> f64 {
        self.edges
            .iter()
            .map(|e| if e.length_m.is_finite() { e.length_m } else { 0.0 })
            .sum()
    }

    /// Project node coordinates into a local planar meters frame anchored at
    /// the node centroid. Best-effort: degenerate input (no nodes, or a
    /// non-finite centroid) returns the graph unchanged, since downstream
    /// math tolerates either frame. Edge geometry stays geographic.
    pub fn project(mut self) -> Self {
        if self.nodes.is_empty() {
            return self;
        }
        if let Crs::LocalMeters { .. } = self.crs {
            return self;
        }

        let n = self.nodes.len() as f64;
        let lat0 = self.nodes.iter().map(|node| node.lat).sum::<f64>() / n;
        let lon0 = self.nodes.iter().map(|node| node.lon).sum::<f64>() / n;
        let cos_lat0 = lat0.to_radians().cos();
        if !lat0.is_finite() || !lon0.is_finite() || cos_lat0.abs() < 1e-9 {
            return self;
        }

        for node in &mut self.nodes {
            node.x = Some((node.lon - lon0) * METERS_PER_DEGREE * cos_lat0);
            node.y = Some((node.lat - lat0) * METERS_PER_DEGREE);
        }
        self.crs = Crs::LocalMeters { lat0, lon0 };
        self
    }

    /// Straight-line distance in meters between two nodes: planar when the
    /// graph is projected, great-circle otherwise
    pub fn straight_line_distance(&self, a: usize, b: usize) -> f64 {
        let na = &self.nodes[a];
        let nb = &self.nodes[b];
        match (self.crs, na.x, na.y, nb.x, nb.y) {
            (Crs::LocalMeters { .. }, Some(ax), Some(ay), Some(bx), Some(by)) => {
                (ax - bx).hypot(ay - by)
            }
            _ => haversine_distance(na.lat, na.lon, nb.lat, nb.lon),
        }
    }

    /// Undirected simple view for path and component computation: reciprocal
    /// and parallel records collapse to one edge per unordered pair, keeping
    /// the minimum length. Self-loops are dropped. Node arena position `i`
    /// maps to `NodeIndex::new(i)`.
    pub fn undirected_view(&self) -> UnGraph<usize, f64> {
        let mut graph = UnGraph::with_capacity(self.nodes.len(), self.edges.len());
        for i in 0..self.nodes.len() {
            graph.add_node(i);
        }

        // first-seen order keeps edge insertion deterministic
        let mut slot: HashMap<(usize, usize), usize> = HashMap::new();
        let mut collapsed: Vec<((usize, usize), f64)> = Vec::new();
        for edge in &self.edges {
            if edge.u == edge.v {
                continue;
            }
            let pair = (edge.u.min(edge.v), edge.u.max(edge.v));
            match slot.get(&pair) {
                Some(&at) => {
                    if edge.length_m < collapsed[at].1 {
                        collapsed[at].1 = edge.length_m;
                    }
                }
                None => {
                    slot.insert(pair, collapsed.len());
                    collapsed.push((pair, edge.length_m));
                }
            }
        }

        for ((u, v), length) in collapsed {
            graph.add_edge(NodeIndex::new(u), NodeIndex::new(v), length);
        }
        graph
    }

    /// Serialization-ready edge table keyed by node identifiers
    pub fn edge_table(&self) -> Vec<EdgeRow> {
        self.edges
            .iter()
            .map(|edge| EdgeRow {
                u: self.nodes[edge.u].id,
                v: self.nodes[edge.v].id,
                key: edge.key,
                length_m: edge.length_m,
                highway: edge.highway.clone(),
                name: edge.name.clone(),
                geometry: edge.geometry.clone(),
                degree: None,
                closeness: None,
                straightness: None,
                eigenvector: None,
                betweenness: None,
            })
            .collect()
    }

    /// Write the graph as a bincode snapshot
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .map_err(|e| Error::Snapshot(format!("create {}: {e}", path.as_ref().display())))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self)
            .map_err(|e| Error::Snapshot(format!("serialize graph: {e}")))
    }

    /// Load a graph from a bincode snapshot
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::Snapshot(format!("open {}: {e}", path.as_ref().display())))?;
        let reader = BufReader::new(file);
        bincode::deserialize_from(reader)
            .map_err(|e| Error::Snapshot(format!("deserialize graph: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_graph() -> StreetGraph {
        let nodes = vec![Node::new(1, 48.85, 2.35), Node::new(2, 48.86, 2.35)];
        let edges = vec![
            Edge {
                u: 0,
                v: 1,
                key: 0,
                length_m: 1112.0,
                geometry: vec![(48.85, 2.35), (48.86, 2.35)],
                highway: Some("residential".to_string()),
                name: None,
                oneway: false,
            },
            Edge {
                u: 1,
                v: 0,
                key: 0,
                length_m: 1112.0,
                geometry: vec![(48.86, 2.35), (48.85, 2.35)],
                highway: Some("residential".to_string()),
                name: None,
                oneway: false,
            },
        ];
        StreetGraph::new(nodes, edges).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range_endpoint() {
        let nodes = vec![Node::new(1, 0.0, 0.0)];
        let edges = vec![Edge {
            u: 0,
            v: 5,
            key: 0,
            length_m: 1.0,
            geometry: Vec::new(),
            highway: None,
            name: None,
            oneway: false,
        }];
        assert!(matches!(
            StreetGraph::new(nodes, edges),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_negative_length() {
        let nodes = vec![Node::new(1, 0.0, 0.0), Node::new(2, 0.0, 0.001)];
        let edges = vec![Edge {
            u: 0,
            v: 1,
            key: 0,
            length_m: -3.0,
            geometry: Vec::new(),
            highway: None,
            name: None,
            oneway: false,
        }];
        assert!(StreetGraph::new(nodes, edges).is_err());
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_distance(48.0, 2.0, 49.0, 2.0);
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn test_undirected_view_collapses_reciprocal_records() {
        let graph = two_node_graph();
        let view = graph.undirected_view();
        assert_eq!(view.node_count(), 2);
        assert_eq!(view.edge_count(), 1);
    }

    #[test]
    fn test_project_fills_planar_coordinates() {
        let graph = two_node_graph().project();
        assert!(matches!(graph.crs, Crs::LocalMeters { .. }));
        for node in &graph.nodes {
            assert!(node.x.is_some() && node.y.is_some());
        }
        // one degree of longitude apart would be wrong; these sit on the
        // same meridian so only y should differ
        let dy = graph.nodes[1].y.unwrap() - graph.nodes[0].y.unwrap();
        assert!((dy.abs() - 1113.2).abs() < 1.0, "got {dy}");
    }

    #[test]
    fn test_project_on_empty_graph_is_noop() {
        let graph = StreetGraph::empty().project();
        assert_eq!(graph.crs, Crs::Geographic);
    }

    #[test]
    fn test_straight_line_matches_frames() {
        let geographic = two_node_graph();
        let projected = two_node_graph().project();
        let dg = geographic.straight_line_distance(0, 1);
        let dp = projected.straight_line_distance(0, 1);
        // equirectangular vs haversine agree to well under a percent at
        // this scale
        assert!((dg - dp).abs() / dg < 0.01, "geographic {dg}, projected {dp}");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");

        let graph = two_node_graph();
        graph.save_snapshot(&path).unwrap();
        let restored = StreetGraph::load_snapshot(&path).unwrap();

        assert_eq!(restored.node_count(), graph.node_count());
        assert_eq!(restored.edge_count(), graph.edge_count());
        assert_eq!(restored.nodes[0].id, 1);
        assert!((restored.total_length_m() - graph.total_length_m()).abs() < 1e-9);
    }

    #[test]
    fn test_load_snapshot_missing_file_errors() {
        let err = StreetGraph::load_snapshot("/nonexistent/graph.bin").unwrap_err();
        assert!(matches!(err, Error::Snapshot(_)));
    }

    #[test]
    fn test_edge_table_uses_node_identifiers() {
        let rows = two_node_graph().edge_table();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].u, 1);
        assert_eq!(rows[0].v, 2);
        assert!(rows[0].betweenness.is_none());
    }
}
