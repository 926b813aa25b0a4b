//! Hexagonal aggregation of edge length
//!
//! Bins every edge's arc-length midpoint into the global H3 grid at a
//! caller-chosen resolution and sums edge lengths per occupied cell.
//! Accumulation runs over a `BTreeMap` keyed by cell index, so identical
//! inputs produce identically ordered, identically summed rows.

use std::collections::BTreeMap;

use h3o::{LatLng, Resolution};
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::graph::{haversine_distance, Edge, StreetGraph};

/// One occupied hexagonal cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexCell {
    /// H3 cell index in its canonical hex-string form
    pub cell: String,
    /// Summed edge length in meters
    pub length_m: f64,
    /// Summed edge length in kilometers, for display convenience
    pub length_km: f64,
    /// Cell boundary ring as (lat, lon) vertices
    pub boundary: Vec<(f64, f64)>,
}

/// Aggregation result: one row per occupied cell, sorted by cell index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexAggregate {
    pub resolution: u8,
    pub cells: Vec<HexCell>,
}

impl HexAggregate {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total length across all cells, in meters
    pub fn total_length_m(&self) -> f64 {
        self.cells.iter().map(|c| c.length_m).sum()
    }
}

/// The point at 50% arc length along an edge's geometry, in geographic
/// coordinates. Falls back to the chord midpoint when the geometry is
/// degenerate.
fn edge_midpoint(edge: &Edge, graph: &StreetGraph) -> (f64, f64) {
    let geometry = &edge.geometry;
    if geometry.len() < 2 {
        let u = &graph.nodes[edge.u];
        let v = &graph.nodes[edge.v];
        return ((u.lat + v.lat) / 2.0, (u.lon + v.lon) / 2.0);
    }

    let segment_lengths: Vec<f64> = geometry
        .windows(2)
        .map(|w| haversine_distance(w[0].0, w[0].1, w[1].0, w[1].1))
        .collect();
    let total: f64 = segment_lengths.iter().sum();
    if total <= 0.0 {
        return geometry[0];
    }

    let mut remaining = total / 2.0;
    for (i, len) in segment_lengths.iter().enumerate() {
        if remaining <= *len {
            let t = if *len > 0.0 { remaining / len } else { 0.0 };
            let (lat1, lon1) = geometry[i];
            let (lat2, lon2) = geometry[i + 1];
            return (lat1 + (lat2 - lat1) * t, lon1 + (lon2 - lon1) * t);
        }
        remaining -= len;
    }
    *geometry.last().expect("geometry has at least two points")
}

/// Bin edge lengths into the global H3 grid at `resolution` (1..=15)
pub fn aggregate(graph: &StreetGraph, resolution: u8) -> Result<HexAggregate> {
    let res = Resolution::try_from(resolution)
        .map_err(|_| Error::InvalidInput(format!("invalid H3 resolution {resolution}")))?;

    let mut sums: BTreeMap<h3o::CellIndex, f64> = BTreeMap::new();
    for edge in &graph.edges {
        let (lat, lon) = edge_midpoint(edge, graph);
        let point = match LatLng::new(lat, lon) {
            Ok(point) => point,
            Err(e) => {
                log::warn!("skipping edge with unbinnable midpoint ({lat}, {lon}): {e}");
                continue;
            }
        };
        *sums.entry(point.to_cell(res)).or_insert(0.0) += edge.length_m;
    }

    let cells = sums
        .into_iter()
        .map(|(cell, length_m)| HexCell {
            cell: cell.to_string(),
            length_m,
            length_km: length_m / 1000.0,
            boundary: cell
                .boundary()
                .iter()
                .map(|vertex| (vertex.lat(), vertex.lng()))
                .collect(),
        })
        .collect();

    Ok(HexAggregate {
        resolution,
        cells,
    })
}
