//! Acquisition configuration for streetgauge
//!
//! One `AcquireConfig` is constructed at process start and passed by
//! reference into the coordinator; nothing here is mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Travel mode used to select the Overpass network filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Walk,
    Bike,
    Drive,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Walk => "walk",
            Mode::Bike => "bike",
            Mode::Drive => "drive",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public Overpass instances tried after any explicitly configured endpoints
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://maps.mail.ru/osm/tools/overpass/api/interpreter",
];

/// Default per-request timeout, matching the Overpass server-side default
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Configuration for the network acquisition coordinator
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Optional endpoint tried before everything else
    pub primary_endpoint: Option<String>,

    /// Additional endpoints tried after the primary, in order
    pub extra_endpoints: Vec<String>,

    /// Per-request timeout for geocoding and endpoint queries
    pub timeout: Duration,

    /// Directory for on-disk Overpass response caching
    pub cache_dir: Option<PathBuf>,

    /// Pre-fetched graph snapshot that bypasses the network when present
    pub local_graph_path: Option<PathBuf>,

    /// Global default for the synthetic lattice fallback; a per-request
    /// flag overrides this
    pub allow_synthetic: bool,

    /// Append the built-in public endpoints after the configured ones.
    /// Off pins the endpoint set to exactly what the operator supplied.
    pub include_default_endpoints: bool,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            primary_endpoint: None,
            extra_endpoints: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_dir: None,
            local_graph_path: None,
            allow_synthetic: false,
            include_default_endpoints: true,
        }
    }
}

impl AcquireConfig {
    /// Parse a comma-separated endpoint list, dropping empty entries
    pub fn parse_extra_endpoints(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The ordered, deduplicated endpoint list: primary first, then extras,
    /// then the built-in public defaults
    pub fn endpoint_order(&self) -> Vec<String> {
        let mut ordered = Vec::new();
        let mut push = |url: &str| {
            if !url.is_empty() && !ordered.iter().any(|e: &String| e.as_str() == url) {
                ordered.push(url.to_string());
            }
        };

        if let Some(primary) = &self.primary_endpoint {
            push(primary);
        }
        for extra in &self.extra_endpoints {
            push(extra);
        }
        if self.include_default_endpoints {
            for default in DEFAULT_ENDPOINTS {
                push(default);
            }
        }
        ordered
    }
}
