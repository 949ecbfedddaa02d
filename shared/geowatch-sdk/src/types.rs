//! Response bodies of the data proxy, as read by the dashboard.
//!
//! Every field has a default so a partial body still renders.

use geowatch_geo::{
    ClimateAnomaly, CountryDisplacement, CountryPopulation, DisplacementFlow, GeoEvent,
    GlobalDisplacementTotals,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UcdpEventsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub data: Vec<GeoEvent>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub cached_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacementResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub global_totals: GlobalDisplacementTotals,
    #[serde(default)]
    pub countries: Vec<CountryDisplacement>,
    #[serde(default)]
    pub top_flows: Vec<DisplacementFlow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateAnomaliesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub anomalies: Vec<ClimateAnomaly>,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountriesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub countries: Vec<CountryPopulation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub cached: bool,
}

/// An event to attach a population exposure estimate to
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureTarget {
    pub id: String,
    pub name: String,
    pub event_type: String,
    pub lat: f64,
    pub lon: f64,
}
