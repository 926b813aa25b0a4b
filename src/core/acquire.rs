//! Network acquisition coordinator
//!
//! Resolves a place to coordinates, then obtains a routable street graph
//! from the first endpoint that answers: local snapshot, cached response,
//! each configured endpoint strictly in order, and finally the synthetic
//! lattice when allowed. Endpoints are queried sequentially, never raced,
//! so failure attribution stays per-endpoint and remote rate limits are
//! respected.

use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::config::{AcquireConfig, Mode};
use crate::core::error::{Error, Result};
use crate::core::failover::FailoverState;
use crate::core::geocode::{Geocoder, NominatimGeocoder};
use crate::core::graph::StreetGraph;
use crate::core::overpass;
use crate::core::synthetic::{synthetic, FALLBACK_STEP_M};

/// Where an acquired graph came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "endpoint")]
pub enum GraphSource {
    LocalSnapshot,
    CachedResponse,
    Endpoint(String),
    Synthetic,
}

impl GraphSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, GraphSource::Synthetic)
    }
}

/// A freshly acquired graph with its provenance
#[derive(Debug)]
pub struct Acquisition {
    pub graph: StreetGraph,
    pub source: GraphSource,
}

/// High-level coordinator owning the one-time configuration and HTTP client
pub struct Coordinator<G: Geocoder = NominatimGeocoder> {
    config: AcquireConfig,
    client: Client,
    geocoder: G,
}

impl Coordinator<NominatimGeocoder> {
    /// Create a coordinator with the default Nominatim geocoder
    pub fn new(config: AcquireConfig) -> Result<Self> {
        let geocoder = NominatimGeocoder::new(config.timeout)?;
        Self::with_geocoder(config, geocoder)
    }
}

impl<G: Geocoder> Coordinator<G> {
    /// Create a coordinator with a caller-supplied geocoder
    pub fn with_geocoder(config: AcquireConfig, geocoder: G) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("streetgauge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::from)?;
        Ok(Self {
            config,
            client,
            geocoder,
        })
    }

    pub fn config(&self) -> &AcquireConfig {
        &self.config
    }

    /// Fetch the street network around `place` for `mode` within
    /// `radius_m`. `allow_synthetic` overrides the configured default when
    /// given.
    pub async fn acquire(
        &self,
        place: &str,
        mode: Mode,
        radius_m: u32,
        allow_synthetic: Option<bool>,
    ) -> Result<Acquisition> {
        if radius_m == 0 {
            return Err(Error::InvalidInput("radius must be positive".to_string()));
        }

        // operator-supplied snapshot bypasses the network entirely
        if let Some(path) = &self.config.local_graph_path {
            if path.exists() {
                match StreetGraph::load_snapshot(path) {
                    Ok(graph) => {
                        log::info!("loaded graph snapshot from {}", path.display());
                        return Ok(Acquisition {
                            graph,
                            source: GraphSource::LocalSnapshot,
                        });
                    }
                    Err(e) => {
                        log::warn!("ignoring unreadable snapshot {}: {e}", path.display());
                    }
                }
            }
        }

        let (lat, lon) = self.geocoder.geocode(place).await?;
        let query = overpass::build_query(mode, radius_m, lat, lon, self.config.timeout);

        if let Some(dir) = &self.config.cache_dir {
            if let Some(graph) = read_cached_response(dir, &query, mode) {
                log::info!("serving '{place}' from response cache");
                return Ok(Acquisition {
                    graph,
                    source: GraphSource::CachedResponse,
                });
            }
        }

        let mut state = FailoverState::start(self.config.endpoint_order());
        let won = loop {
            let Some(endpoint) = state.current().map(str::to_string) else {
                break None;
            };
            match self.fetch_endpoint(&endpoint, &query).await {
                Ok(body) => match overpass::parse_response(&body, mode) {
                    Ok(graph) if !graph.nodes.is_empty() => {
                        state = state.succeed();
                        break Some((endpoint, body, graph));
                    }
                    Ok(_) => {
                        log::warn!("endpoint {endpoint} returned an empty network");
                        state = state.fail("empty network response");
                    }
                    Err(e) => {
                        log::warn!("endpoint {endpoint} failed: {e}");
                        state = state.fail(e.to_string());
                    }
                },
                Err(e) => {
                    log::warn!("endpoint {endpoint} failed: {e}");
                    state = state.fail(e.to_string());
                }
            }
        };

        if let Some((endpoint, body, graph)) = won {
            if let Some(dir) = &self.config.cache_dir {
                write_cached_response(dir, &query, &body);
            }
            if let Some(path) = &self.config.local_graph_path {
                if !path.exists() {
                    if let Err(e) = graph.save_snapshot(path) {
                        log::warn!("could not write snapshot {}: {e}", path.display());
                    }
                }
            }
            return Ok(Acquisition {
                graph,
                source: GraphSource::Endpoint(endpoint),
            });
        }

        let allow = allow_synthetic.unwrap_or(self.config.allow_synthetic);
        if allow {
            log::warn!("all endpoints failed; generating synthetic lattice for '{place}'");
            let graph = synthetic((lat, lon), radius_m, FALLBACK_STEP_M)?;
            return Ok(Acquisition {
                graph,
                source: GraphSource::Synthetic,
            });
        }

        Err(Error::SourceUnavailable {
            place: place.to_string(),
            mode: mode.to_string(),
            radius_m,
            attempts: state.into_attempts(),
        })
    }

    async fn fetch_endpoint(&self, endpoint: &str, query: &str) -> Result<String> {
        let response = self
            .client
            .post(endpoint)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(Error::from)?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(Error::HttpError("rate limited (429)".to_string()));
            }
            return Err(Error::HttpError(format!("HTTP status {status}")));
        }
        response.text().await.map_err(Error::from)
    }
}

/// Cache file for one query: content-addressed by the query itself, so a
/// changed radius, mode or center never aliases
fn cache_path(dir: &Path, query: &str) -> PathBuf {
    let digest = Sha256::digest(query.as_bytes());
    dir.join(format!("overpass-{}.json", &hex::encode(digest)[..16]))
}

fn read_cached_response(dir: &Path, query: &str, mode: Mode) -> Option<StreetGraph> {
    let path = cache_path(dir, query);
    let body = std::fs::read_to_string(&path).ok()?;
    match overpass::parse_response(&body, mode) {
        Ok(graph) if !graph.nodes.is_empty() => Some(graph),
        Ok(_) => None,
        Err(e) => {
            log::warn!("ignoring corrupt cache file {}: {e}", path.display());
            None
        }
    }
}

fn write_cached_response(dir: &Path, query: &str, body: &str) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        log::warn!("could not create cache directory {}: {e}", dir.display());
        return;
    }
    let path = cache_path(dir, query);
    if let Err(e) = std::fs::write(&path, body) {
        log::warn!("could not write cache file {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cache_path_is_stable_and_query_sensitive() {
        let dir = Path::new("/tmp/cache");
        let a = cache_path(dir, "query one");
        let b = cache_path(dir, "query one");
        let c = cache_path(dir, "query two");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("overpass-"));
    }

    #[tokio::test]
    async fn test_zero_radius_is_rejected() {
        let config = AcquireConfig {
            include_default_endpoints: false,
            ..Default::default()
        };
        let coordinator = Coordinator::with_geocoder(
            config,
            crate::core::geocode::StaticGeocoder { lat: 0.0, lon: 0.0 },
        )
        .unwrap();
        let err = coordinator
            .acquire("anywhere", Mode::Walk, 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_no_endpoints_and_no_fallback_is_source_unavailable() {
        let config = AcquireConfig {
            include_default_endpoints: false,
            timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let coordinator = Coordinator::with_geocoder(
            config,
            crate::core::geocode::StaticGeocoder {
                lat: 45.0,
                lon: 4.0,
            },
        )
        .unwrap();

        let err = coordinator
            .acquire("anywhere", Mode::Walk, 500, Some(false))
            .await
            .unwrap_err();
        match err {
            Error::SourceUnavailable { attempts, .. } => assert!(attempts.is_empty()),
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_endpoints_with_fallback_yields_lattice() {
        let config = AcquireConfig {
            include_default_endpoints: false,
            timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let coordinator = Coordinator::with_geocoder(
            config,
            crate::core::geocode::StaticGeocoder {
                lat: 45.0,
                lon: 4.0,
            },
        )
        .unwrap();

        let acquired = coordinator
            .acquire("anywhere", Mode::Walk, 500, Some(true))
            .await
            .unwrap();
        assert!(acquired.source.is_synthetic());
        assert!(!acquired.graph.is_empty());
    }
}
