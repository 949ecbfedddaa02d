//! Population figures for priority countries and point exposure estimates

use geowatch_cache::{decode_as, CachePolicy, DecodeError, FetchError, Payload};
use geowatch_core::CacheKey;
use geowatch_geo::population::DEFAULT_RADIUS_KM;
use geowatch_geo::{priority_countries, CountryPopulation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::now_rfc3339;

pub const ENDPOINT: &str = "/api/worldpop-exposure";

pub fn cache_key() -> CacheKey {
    CacheKey::new("worldpop:countries", "v1")
}

pub fn cache_policy() -> CachePolicy {
    let ttl = Duration::from_secs(7 * 24 * 60 * 60);
    CachePolicy::new(ENDPOINT, ttl).with_memory(2, ttl * 4)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountriesPayload {
    pub success: bool,
    pub countries: Vec<CountryPopulation>,
    pub cached_at: String,
}

impl Payload for CountriesPayload {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        decode_as(value, &["countries"])
    }
}

/// The priority-country table; no remote call involved
pub async fn fetch_countries() -> Result<CountriesPayload, FetchError> {
    Ok(CountriesPayload {
        success: true,
        countries: priority_countries(),
        cached_at: now_rfc3339(),
    })
}

/// Query string of `GET /api/worldpop-exposure`, kept as raw strings so
/// bad numbers can be reported as a 400 body.
#[derive(Debug, Default, Deserialize)]
pub struct ExposureQuery {
    pub mode: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub radius: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Countries,
    Exposure { lat: f64, lon: f64, radius_km: f64 },
}

impl ExposureQuery {
    /// `None` means an exposure request without a usable lat/lon
    pub fn mode(&self) -> Option<Mode> {
        if self.mode.as_deref() != Some("exposure") {
            return Some(Mode::Countries);
        }
        let lat = parse_finite(self.lat.as_deref())?;
        let lon = parse_finite(self.lon.as_deref())?;
        let radius_km = parse_finite(self.radius.as_deref())
            .filter(|r| *r != 0.0)
            .unwrap_or(DEFAULT_RADIUS_KM);
        Some(Mode::Exposure { lat, lon, radius_km })
    }
}

fn parse_finite(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
