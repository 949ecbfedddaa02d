//! Conflict event records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::lenient;

/// UCDP violence category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolenceType {
    StateBased,
    NonState,
    OneSided,
}

impl ViolenceType {
    pub const ALL: [ViolenceType; 3] = [Self::StateBased, Self::NonState, Self::OneSided];

    /// Map the UCDP numeric code; unknown codes count as state-based.
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Self::NonState,
            3 => Self::OneSided,
            _ => Self::StateBased,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateBased => "state-based",
            Self::NonState => "non-state",
            Self::OneSided => "one-sided",
        }
    }
}

impl fmt::Display for ViolenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A georeferenced conflict event (UCDP GED, normalised)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEvent {
    pub id: String,
    pub date_start: String,
    pub date_end: String,
    #[serde(rename = "latitude")]
    pub lat: f64,
    #[serde(rename = "longitude")]
    pub lon: f64,
    pub country: String,
    pub side_a: String,
    pub side_b: String,
    pub deaths_best: u64,
    pub deaths_low: u64,
    pub deaths_high: u64,
    #[serde(rename = "type_of_violence")]
    pub violence_type: ViolenceType,
    pub source_original: String,
}

/// A secondary-source (ACLED) event, only the fields matching needs.
///
/// ACLED serves coordinates and fatalities as strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcledEvent {
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub event_date: String,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub fatalities: Option<f64>,
}

/// Group events by country, blank countries under `Unknown`.
pub fn group_by_country(events: &[GeoEvent]) -> BTreeMap<String, Vec<GeoEvent>> {
    let mut groups: BTreeMap<String, Vec<GeoEvent>> = BTreeMap::new();
    for event in events {
        let country = if event.country.is_empty() {
            "Unknown"
        } else {
            event.country.as_str()
        };
        groups.entry(country.to_string()).or_default().push(event.clone());
    }
    groups
}

/// Group events by violence type. Every type is present, possibly empty.
pub fn group_by_type(events: &[GeoEvent]) -> BTreeMap<ViolenceType, Vec<GeoEvent>> {
    let mut groups: BTreeMap<ViolenceType, Vec<GeoEvent>> =
        ViolenceType::ALL.iter().map(|t| (*t, Vec::new())).collect();
    for event in events {
        groups.entry(event.violence_type).or_default().push(event.clone());
    }
    groups
}

#[cfg(test)]
pub(crate) fn sample_event(id: &str, country: &str, violence_type: ViolenceType) -> GeoEvent {
    GeoEvent {
        id: id.to_string(),
        date_start: "2024-05-01".to_string(),
        date_end: "2024-05-01".to_string(),
        lat: 0.0,
        lon: 0.0,
        country: country.to_string(),
        side_a: String::new(),
        side_b: String::new(),
        deaths_best: 0,
        deaths_low: 0,
        deaths_high: 0,
        violence_type,
        source_original: String::new(),
    }
}
