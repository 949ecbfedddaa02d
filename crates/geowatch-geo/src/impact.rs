//! Per-country conflict impact correlation across datasets.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::climate::{AnomalySeverity, ClimateAnomaly};
use crate::displacement::CountryDisplacement;
use crate::event::GeoEvent;
use crate::population::PopulationExposure;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictImpactLink {
    pub country: String,
    pub conflict_events: u64,
    pub total_deaths: u64,
    pub displacement_outflow: u64,
    pub climate_anomaly: Option<ClimateAnomaly>,
    pub population_exposed: u64,
    /// 0..=100: conflict up to 40, displacement 30, climate 20, exposure 10
    pub combined_severity: u32,
}

/// Join conflict events with displacement, climate and exposure data per
/// country and rank by combined severity, highest first.
pub fn correlate_conflict_impact(
    events: &[GeoEvent],
    displacement: &[CountryDisplacement],
    anomalies: &[ClimateAnomaly],
    exposures: &[PopulationExposure],
) -> Vec<ConflictImpactLink> {
    let mut by_country: Vec<(&str, u64, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for event in events {
        let idx = *index.entry(event.country.as_str()).or_insert_with(|| {
            by_country.push((event.country.as_str(), 0, 0));
            by_country.len() - 1
        });
        by_country[idx].1 += 1;
        by_country[idx].2 += event.deaths_best;
    }

    let mut displacement_by_key: HashMap<&str, &CountryDisplacement> = HashMap::new();
    for country in displacement {
        displacement_by_key.insert(country.name.as_str(), country);
        displacement_by_key.insert(country.code.as_str(), country);
    }

    let mut exposed_by_name: HashMap<&str, u64> = HashMap::new();
    for exposure in exposures {
        *exposed_by_name.entry(exposure.event_name.as_str()).or_default() +=
            exposure.exposed_population;
    }

    let mut links: Vec<ConflictImpactLink> = by_country
        .into_iter()
        .map(|(country, events, deaths)| {
            let displacement_outflow = displacement_by_key
                .get(country)
                .map(|d| d.refugees + d.asylum_seekers)
                .unwrap_or(0);
            let climate_anomaly = matching_anomaly(country, anomalies).cloned();
            let exposed = exposed_by_name.get(country).copied().unwrap_or(0);

            let severity = conflict_score(events, deaths)
                + displacement_score(displacement_outflow)
                + climate_score(climate_anomaly.as_ref())
                + exposure_score(exposed);

            ConflictImpactLink {
                country: country.to_string(),
                conflict_events: events,
                total_deaths: deaths,
                displacement_outflow,
                climate_anomaly,
                population_exposed: exposed,
                combined_severity: severity.round() as u32,
            }
        })
        .collect();

    links.sort_by_key(|link| std::cmp::Reverse(link.combined_severity));
    links
}

/// Zone and country names overlap case-insensitively in either direction.
fn matching_anomaly<'a>(country: &str, anomalies: &'a [ClimateAnomaly]) -> Option<&'a ClimateAnomaly> {
    if country.is_empty() {
        return None;
    }
    let country = country.to_lowercase();
    anomalies.iter().find(|anomaly| {
        let zone = anomaly.zone.to_lowercase();
        zone.contains(&country) || country.contains(&zone)
    })
}

fn conflict_score(events: u64, deaths: u64) -> f64 {
    (events as f64 * 2.0 + (deaths as f64).sqrt() * 3.0).min(40.0)
}

fn displacement_score(outflow: u64) -> f64 {
    match outflow {
        n if n > 1_000_000 => 30.0,
        n if n > 100_000 => 15.0,
        _ => 0.0,
    }
}

fn climate_score(anomaly: Option<&ClimateAnomaly>) -> f64 {
    match anomaly.map(|a| a.severity) {
        Some(AnomalySeverity::Extreme) => 20.0,
        Some(AnomalySeverity::Moderate) => 10.0,
        _ => 0.0,
    }
}

fn exposure_score(exposed: u64) -> f64 {
    match exposed {
        n if n > 1_000_000 => 10.0,
        n if n > 100_000 => 5.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::AnomalyType;
    use crate::event::{sample_event, ViolenceType};

    fn event(country: &str, deaths: u64) -> GeoEvent {
        let mut e = sample_event("e", country, ViolenceType::StateBased);
        e.deaths_best = deaths;
        e
    }

    fn displaced(code: &str, name: &str, refugees: u64) -> CountryDisplacement {
        CountryDisplacement {
            code: code.into(),
            name: name.into(),
            refugees,
            asylum_seekers: 0,
            idps: 0,
            stateless: 0,
            total_displaced: refugees,
            host_refugees: 0,
            host_asylum_seekers: 0,
            host_total: 0,
            lat: None,
            lon: None,
        }
    }

    fn anomaly(zone: &str, severity: AnomalySeverity) -> ClimateAnomaly {
        ClimateAnomaly {
            zone: zone.into(),
            lat: 0.0,
            lon: 0.0,
            temp_delta: 0.0,
            precip_delta: 0.0,
            severity,
            anomaly_type: AnomalyType::Warm,
            period: String::new(),
        }
    }

    #[test]
    fn test_scores_and_ranking() {
        let events = vec![
            event("Ukraine", 100),
            event("Ukraine", 44),
            event("Mali", 0),
        ];
        let displacement = vec![displaced("UKR", "Ukraine", 2_000_000)];
        let anomalies = vec![anomaly("Ukraine", AnomalySeverity::Extreme)];
        let exposures = vec![PopulationExposure {
            event_id: "x".into(),
            event_name: "Ukraine".into(),
            event_type: "conflict".into(),
            lat: 0.0,
            lon: 0.0,
            exposed_population: 500_000,
            exposure_radius_km: 50.0,
        }];

        let links = correlate_conflict_impact(&events, &displacement, &anomalies, &exposures);
        assert_eq!(links.len(), 2);

        let ukraine = &links[0];
        assert_eq!(ukraine.country, "Ukraine");
        assert_eq!(ukraine.conflict_events, 2);
        assert_eq!(ukraine.total_deaths, 144);
        // min(40, 4 + 12 * 3) + 30 + 20 + 5
        assert_eq!(ukraine.combined_severity, 95);
        assert!(ukraine.climate_anomaly.is_some());

        let mali = &links[1];
        assert_eq!(mali.combined_severity, 2);
        assert!(mali.climate_anomaly.is_none());
    }

    #[test]
    fn test_anomaly_zone_matching_is_substring_both_ways() {
        let anomalies = vec![anomaly("Sahel", AnomalySeverity::Moderate)];
        assert!(matching_anomaly("sahel region", &anomalies).is_some());
        assert!(matching_anomaly("SAHEL", &anomalies).is_some());
        assert!(matching_anomaly("Chad", &anomalies).is_none());
        assert!(matching_anomaly("", &anomalies).is_none());
    }

    #[test]
    fn test_displacement_matched_by_code_or_name() {
        let links = correlate_conflict_impact(
            &[event("SDN", 0)],
            &[displaced("SDN", "Sudan", 150_000)],
            &[],
            &[],
        );
        assert_eq!(links[0].displacement_outflow, 150_000);
        assert_eq!(links[0].combined_severity, 2 + 15);
    }
}
