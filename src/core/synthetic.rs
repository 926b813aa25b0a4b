//! Synthetic fallback network
//!
//! A deterministic square lattice used when every remote endpoint fails.
//! Identical inputs always produce an identical graph, so callers can
//! reason about the fallback and tests can rely on it.

use crate::core::error::Result;
use crate::core::graph::{Edge, Node, StreetGraph, METERS_PER_DEGREE};

/// Lattice step used by the acquisition coordinator's fallback
pub const FALLBACK_STEP_M: u32 = 100;

/// Generate a square lattice of `floor(extent_m / step_m) + 1` nodes per
/// axis centered on `center`, with two directed edges of length `step_m`
/// between every adjacent pair. Meter offsets convert to degrees via the
/// local equirectangular approximation.
pub fn synthetic(center: (f64, f64), extent_m: u32, step_m: u32) -> Result<StreetGraph> {
    let (lat0, lon0) = center;
    let cells = if step_m == 0 { 0 } else { extent_m / step_m };
    let per_axis = cells as usize + 1;
    let step = step_m as f64;

    let dlat = step / METERS_PER_DEGREE;
    let cos_lat0 = lat0.to_radians().cos();
    let dlon = if cos_lat0.abs() < 1e-9 {
        dlat
    } else {
        step / (METERS_PER_DEGREE * cos_lat0)
    };
    let half = cells as f64 / 2.0;

    let mut nodes = Vec::with_capacity(per_axis * per_axis);
    for row in 0..per_axis {
        for col in 0..per_axis {
            let id = (row * per_axis + col) as i64;
            let lat = lat0 + (row as f64 - half) * dlat;
            let lon = lon0 + (col as f64 - half) * dlon;
            nodes.push(Node::new(id, lat, lon));
        }
    }

    let mut edges = Vec::with_capacity(4 * cells as usize * per_axis);
    let mut connect = |a: usize, b: usize, nodes: &[Node]| {
        let geometry = vec![
            (nodes[a].lat, nodes[a].lon),
            (nodes[b].lat, nodes[b].lon),
        ];
        edges.push(Edge {
            u: a,
            v: b,
            key: 0,
            length_m: step,
            geometry: geometry.clone(),
            highway: Some("synthetic".to_string()),
            name: None,
            oneway: false,
        });
        edges.push(Edge {
            u: b,
            v: a,
            key: 0,
            length_m: step,
            geometry: geometry.into_iter().rev().collect(),
            highway: Some("synthetic".to_string()),
            name: None,
            oneway: false,
        });
    };

    for row in 0..per_axis {
        for col in 0..per_axis {
            let here = row * per_axis + col;
            if col + 1 < per_axis {
                connect(here, here + 1, &nodes);
            }
            if row + 1 < per_axis {
                connect(here, here + per_axis, &nodes);
            }
        }
    }

    StreetGraph::new(nodes, edges)
}
