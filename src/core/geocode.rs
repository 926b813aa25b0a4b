//! Geocoding seam
//!
//! Resolving a place name to coordinates is an external capability: the
//! coordinator only depends on the `Geocoder` trait. The default
//! implementation queries Nominatim and memoizes results in-process. A
//! `"lat,lon"` literal in the place string bypasses the network entirely.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::core::error::{Error, Result};

/// Resolves a free-text place to (latitude, longitude)
pub trait Geocoder: Send + Sync {
    fn geocode(&self, place: &str) -> impl Future<Output = Result<(f64, f64)>> + Send;
}

/// Parse a `"lat,lon"` literal, e.g. `"45.764, 4.8357"`
pub fn parse_coordinate_literal(place: &str) -> Option<(f64, f64)> {
    let (lat_raw, lon_raw) = place.split_once(',')?;
    let lat: f64 = lat_raw.trim().parse().ok()?;
    let lon: f64 = lon_raw.trim().parse().ok()?;
    if lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0 {
        Some((lat, lon))
    } else {
        None
    }
}

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

/// Nominatim-backed geocoder with an in-process result cache
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    cache: Mutex<HashMap<String, (f64, f64)>>,
}

impl NominatimGeocoder {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(timeout, NOMINATIM_URL)
    }

    /// Point the geocoder at a different server (used by tests)
    pub fn with_base_url(timeout: Duration, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("streetgauge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::from)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn lookup(&self, place: &str) -> Result<(f64, f64)> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(Error::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("geocoder returned {status}")));
        }

        let hits: Vec<NominatimHit> = response.json().await.map_err(Error::from)?;
        let hit = hits
            .first()
            .ok_or_else(|| Error::InvalidInput("no geocoding results".to_string()))?;
        let lat: f64 = hit
            .lat
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad latitude '{}'", hit.lat)))?;
        let lon: f64 = hit
            .lon
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad longitude '{}'", hit.lon)))?;
        Ok((lat, lon))
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, place: &str) -> impl Future<Output = Result<(f64, f64)>> + Send {
        async move {
            if let Some(coords) = parse_coordinate_literal(place) {
                return Ok(coords);
            }
            if let Some(&coords) = self.cache.lock().unwrap().get(place) {
                log::debug!("geocode cache hit for '{place}'");
                return Ok(coords);
            }

            let coords = self.lookup(place).await.map_err(|e| Error::Geocode {
                place: place.to_string(),
                message: e.to_string(),
            })?;
            self.cache
                .lock()
                .unwrap()
                .insert(place.to_string(), coords);
            Ok(coords)
        }
    }
}

/// Fixed-answer geocoder for tests and offline use
pub struct StaticGeocoder {
    pub lat: f64,
    pub lon: f64,
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, _place: &str) -> impl Future<Output = Result<(f64, f64)>> + Send {
        let coords = (self.lat, self.lon);
        async move { Ok(coords) }
    }
}
