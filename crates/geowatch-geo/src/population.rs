//! Population exposure estimates around events.
//!
//! Uses a static table of priority countries (population, land area and an
//! approximate centroid); exposure is uniform density times circle area.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::distance::planar_distance_deg;

/// Default radius when a caller gives none
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

struct PriorityCountry {
    code: &'static str,
    name: &'static str,
    population: u64,
    area_km2: u64,
    centroid: (f64, f64),
}

const fn country(
    code: &'static str,
    name: &'static str,
    population: u64,
    area_km2: u64,
    centroid: (f64, f64),
) -> PriorityCountry {
    PriorityCountry {
        code,
        name,
        population,
        area_km2,
        centroid,
    }
}

const PRIORITY_COUNTRIES: [PriorityCountry; 20] = [
    country("UKR", "Ukraine", 37_000_000, 603_550, (48.4, 31.2)),
    country("RUS", "Russia", 144_100_000, 17_098_242, (61.5, 105.3)),
    country("ISR", "Israel", 9_800_000, 22_072, (31.0, 34.8)),
    country("PSE", "Palestine", 5_400_000, 6_020, (31.9, 35.2)),
    country("SYR", "Syria", 22_100_000, 185_180, (35.0, 38.0)),
    country("IRN", "Iran", 88_600_000, 1_648_195, (32.4, 53.7)),
    country("TWN", "Taiwan", 23_600_000, 36_193, (23.7, 121.0)),
    country("ETH", "Ethiopia", 126_500_000, 1_104_300, (9.1, 40.5)),
    country("SDN", "Sudan", 48_100_000, 1_861_484, (15.5, 32.5)),
    country("SSD", "South Sudan", 11_400_000, 619_745, (6.9, 31.3)),
    country("SOM", "Somalia", 18_100_000, 637_657, (5.2, 46.2)),
    country("YEM", "Yemen", 34_400_000, 527_968, (15.6, 48.5)),
    country("AFG", "Afghanistan", 42_200_000, 652_230, (33.9, 67.7)),
    country("PAK", "Pakistan", 240_500_000, 881_913, (30.4, 69.3)),
    country("IND", "India", 1_428_600_000, 3_287_263, (20.6, 79.0)),
    country("MMR", "Myanmar", 54_200_000, 676_578, (19.8, 96.7)),
    country("COD", "DR Congo", 102_300_000, 2_344_858, (-4.0, 21.8)),
    country("NGA", "Nigeria", 223_800_000, 923_768, (9.1, 7.5)),
    country("MLI", "Mali", 22_600_000, 1_240_192, (17.6, -4.0)),
    country("BFA", "Burkina Faso", 22_700_000, 274_200, (12.3, -1.6)),
];

impl PriorityCountry {
    fn density(&self) -> f64 {
        self.population as f64 / self.area_km2 as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryPopulation {
    pub code: String,
    pub name: String,
    pub population: u64,
    pub density_per_km2: u64,
}

/// Population within a radius of a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureEstimate {
    pub success: bool,
    pub exposed_population: u64,
    pub exposure_radius_km: f64,
    pub nearest_country: String,
    pub density_per_km2: u64,
}

/// Exposure attached to a specific dashboard event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationExposure {
    pub event_id: String,
    pub event_name: String,
    pub event_type: String,
    pub lat: f64,
    pub lon: f64,
    pub exposed_population: u64,
    pub exposure_radius_km: f64,
}

/// The priority-country table with rounded densities
pub fn priority_countries() -> Vec<CountryPopulation> {
    PRIORITY_COUNTRIES
        .iter()
        .map(|c| CountryPopulation {
            code: c.code.to_string(),
            name: c.name.to_string(),
            population: c.population,
            density_per_km2: c.density().round() as u64,
        })
        .collect()
}

/// Estimate people within `radius_km` of a point using the density of the
/// nearest priority country.
pub fn estimate_exposure(lat: f64, lon: f64, radius_km: f64) -> ExposureEstimate {
    let nearest = PRIORITY_COUNTRIES.iter().min_by(|a, b| {
        let da = planar_distance_deg(lat, lon, a.centroid.0, a.centroid.1);
        let db = planar_distance_deg(lat, lon, b.centroid.0, b.centroid.1);
        da.total_cmp(&db)
    });

    // the table is non-empty; the fallback density is only a guard
    let (code, density) = match nearest {
        Some(c) => (c.code.to_string(), c.density()),
        None => (String::new(), 100.0),
    };

    let area = PI * radius_km * radius_km;
    ExposureEstimate {
        success: true,
        exposed_population: (density * area).round().max(0.0) as u64,
        exposure_radius_km: radius_km,
        nearest_country: code,
        density_per_km2: density.round() as u64,
    }
}

/// Radius used when enriching an event of the given type
pub fn radius_for_event_type(event_type: &str) -> f64 {
    match event_type {
        "conflict" | "battle" | "state-based" | "non-state" | "one-sided" => 50.0,
        "earthquake" | "flood" => 100.0,
        "fire" | "wildfire" => 30.0,
        _ => DEFAULT_RADIUS_KM,
    }
}

/// Compact population label: `1.2M`, `350K`, `999`
pub fn format_population(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.0}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_countries_table() {
        let countries = priority_countries();
        assert_eq!(countries.len(), 20);
        let ukraine = &countries[0];
        assert_eq!(ukraine.code, "UKR");
        assert_eq!(ukraine.density_per_km2, 61);
    }

    #[test]
    fn test_exposure_uses_nearest_centroid() {
        let estimate = estimate_exposure(48.0, 31.0, 50.0);
        assert_eq!(estimate.nearest_country, "UKR");
        let expected = (37_000_000.0 / 603_550.0) * PI * 2500.0;
        assert_eq!(estimate.exposed_population, expected.round() as u64);
        assert_eq!(estimate.exposure_radius_km, 50.0);
    }

    #[test]
    fn test_radius_by_event_type() {
        assert_eq!(radius_for_event_type("one-sided"), 50.0);
        assert_eq!(radius_for_event_type("earthquake"), 100.0);
        assert_eq!(radius_for_event_type("wildfire"), 30.0);
        assert_eq!(radius_for_event_type("protest"), 50.0);
    }

    #[test]
    fn test_format_population() {
        assert_eq!(format_population(2_460_000), "2.5M");
        assert_eq!(format_population(350_400), "350K");
        assert_eq!(format_population(999), "999");
    }
}
