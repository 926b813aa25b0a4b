//! Overpass query construction and response parsing
//!
//! Builds a bounded-radius `around:` query for the requested travel mode
//! and turns the JSON answer into a `StreetGraph`. Ways are split at
//! intersection nodes (nodes shared between ways, or way endpoints); each
//! run between intersections becomes one edge carrying the intermediate
//! geometry and the great-circle length summed along it.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::core::config::Mode;
use crate::core::error::{Error, Result};
use crate::core::graph::{haversine_distance, Edge, Node, StreetGraph};

/// Highway filter for a travel mode, in Overpass tag-regex form
fn mode_filter(mode: Mode) -> &'static str {
    match mode {
        Mode::Walk => {
            r#"["highway"]["area"!~"yes"]["highway"!~"abandoned|construction|motorway|motorway_link|proposed|raceway"]["foot"!~"no"]["service"!~"private"]"#
        }
        Mode::Bike => {
            r#"["highway"]["area"!~"yes"]["highway"!~"abandoned|construction|footway|motorway|motorway_link|proposed|raceway|steps"]["bicycle"!~"no"]["service"!~"private"]"#
        }
        Mode::Drive => {
            r#"["highway"]["area"!~"yes"]["highway"!~"abandoned|bridleway|construction|corridor|cycleway|footway|path|pedestrian|proposed|raceway|steps|track"]["motor_vehicle"!~"no"]"#
        }
    }
}

/// Overpass QL for all mode-passable ways within `radius_m` of a point
pub fn build_query(mode: Mode, radius_m: u32, lat: f64, lon: f64, timeout: Duration) -> String {
    format!(
        "[out:json][timeout:{}];(way{}(around:{},{:.7},{:.7}););out geom;",
        timeout.as_secs(),
        mode_filter(mode),
        radius_m,
        lat,
        lon
    )
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    nodes: Vec<i64>,
    #[serde(default)]
    geometry: Vec<GeomPoint>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct GeomPoint {
    lat: f64,
    lon: f64,
}

struct GraphBuilder {
    nodes: Vec<Node>,
    index: HashMap<i64, usize>,
    edges: Vec<Edge>,
    parallel: HashMap<(usize, usize), u32>,
}

impl GraphBuilder {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            parallel: HashMap::new(),
        }
    }

    fn intern(&mut self, id: i64, lat: f64, lon: f64) -> usize {
        *self.index.entry(id).or_insert_with(|| {
            self.nodes.push(Node::new(id, lat, lon));
            self.nodes.len() - 1
        })
    }

    fn add_edge(
        &mut self,
        u: usize,
        v: usize,
        length_m: f64,
        geometry: Vec<(f64, f64)>,
        tags: &HashMap<String, String>,
        oneway: bool,
    ) {
        let key = {
            let counter = self.parallel.entry((u, v)).or_insert(0);
            let key = *counter;
            *counter += 1;
            key
        };
        self.edges.push(Edge {
            u,
            v,
            key,
            length_m,
            geometry,
            highway: tags.get("highway").cloned(),
            name: tags.get("name").cloned(),
            oneway,
        });
    }
}

/// Directionality of a way for the requested mode
enum WayDirection {
    Both,
    Forward,
    Reverse,
}

fn way_direction(mode: Mode, tags: &HashMap<String, String>) -> WayDirection {
    if mode != Mode::Drive {
        // foot and bicycle traffic ignores oneway restrictions
        return WayDirection::Both;
    }
    match tags.get("oneway").map(String::as_str) {
        Some("yes") | Some("true") | Some("1") => WayDirection::Forward,
        Some("-1") | Some("reverse") => WayDirection::Reverse,
        _ => WayDirection::Both,
    }
}

/// Parse an Overpass JSON body into a street graph for `mode`
pub fn parse_response(body: &str, mode: Mode) -> Result<StreetGraph> {
    let response: OverpassResponse = serde_json::from_str(body)
        .map_err(|e| Error::HttpError(format!("malformed Overpass response: {e}")))?;

    let ways: Vec<&OverpassElement> = response
        .elements
        .iter()
        .filter(|e| {
            e.kind == "way"
                && e.tags.contains_key("highway")
                && e.nodes.len() >= 2
                && e.nodes.len() == e.geometry.len()
        })
        .collect();

    // nodes shared between ways, or reused within one, are intersections
    let mut usage: HashMap<i64, u32> = HashMap::new();
    for way in &ways {
        for id in &way.nodes {
            *usage.entry(*id).or_insert(0) += 1;
        }
    }

    let mut builder = GraphBuilder::new();
    for way in &ways {
        let direction = way_direction(mode, &way.tags);
        let oneway = !matches!(direction, WayDirection::Both);
        let last = way.nodes.len() - 1;

        let mut seg_start = 0usize;
        let mut geometry = vec![(way.geometry[0].lat, way.geometry[0].lon)];
        let mut length_m = 0.0;

        for i in 1..way.nodes.len() {
            let prev = &way.geometry[i - 1];
            let here = &way.geometry[i];
            length_m += haversine_distance(prev.lat, prev.lon, here.lat, here.lon);
            geometry.push((here.lat, here.lon));

            let is_cut = i == last || usage.get(&way.nodes[i]).copied().unwrap_or(0) >= 2;
            if !is_cut {
                continue;
            }

            let (s_lat, s_lon) = geometry[0];
            let u = builder.intern(way.nodes[seg_start], s_lat, s_lon);
            let v = builder.intern(way.nodes[i], here.lat, here.lon);

            if u != v || length_m > 0.0 {
                let reversed: Vec<(f64, f64)> = geometry.iter().rev().copied().collect();
                match direction {
                    WayDirection::Both => {
                        builder.add_edge(u, v, length_m, geometry.clone(), &way.tags, oneway);
                        builder.add_edge(v, u, length_m, reversed, &way.tags, oneway);
                    }
                    WayDirection::Forward => {
                        builder.add_edge(u, v, length_m, geometry.clone(), &way.tags, oneway);
                    }
                    WayDirection::Reverse => {
                        builder.add_edge(v, u, length_m, reversed, &way.tags, oneway);
                    }
                }
            }

            seg_start = i;
            geometry = vec![(here.lat, here.lon)];
            length_m = 0.0;
        }
    }

    log::debug!(
        "parsed {} ways into {} nodes, {} edges",
        ways.len(),
        builder.nodes.len(),
        builder.edges.len()
    );
    StreetGraph::new(builder.nodes, builder.edges)
}
