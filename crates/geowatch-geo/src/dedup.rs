//! Cross-source conflict event deduplication
//!
//! A primary event is dropped when ANY secondary event lies within the date
//! window and distance threshold and reports a compatible casualty count:
//! both zero, or both non-zero with a primary/secondary ratio inside
//! `[min_ratio, max_ratio]`.
//!
//! Secondary events are parsed once and sorted by latitude, so each primary
//! event only compares against candidates inside a latitude band as wide as
//! the distance threshold.

use chrono::{DateTime, Utc};

use crate::dates::parse_timestamp;
use crate::distance::{haversine_km, KM_PER_DEGREE_LAT};
use crate::event::{AcledEvent, GeoEvent};

const MS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Matching thresholds
#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    pub max_days: f64,
    pub max_distance_km: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_days: 7.0,
            max_distance_km: 50.0,
            min_ratio: 0.5,
            max_ratio: 2.0,
        }
    }
}

struct Candidate {
    lat: f64,
    lon: f64,
    at: DateTime<Utc>,
    deaths: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Primary events with no match among `secondary`, in their original order.
    pub fn deduplicate(&self, primary: &[GeoEvent], secondary: &[AcledEvent]) -> Vec<GeoEvent> {
        if secondary.is_empty() {
            return primary.to_vec();
        }

        let candidates = prepare_candidates(secondary);
        let kept: Vec<GeoEvent> = primary
            .iter()
            .filter(|event| !self.has_match(event, &candidates))
            .cloned()
            .collect();

        tracing::debug!(
            primary = primary.len(),
            secondary = secondary.len(),
            dropped = primary.len() - kept.len(),
            "deduplicated conflict events"
        );
        kept
    }

    /// True when `event` duplicates any of `secondary`.
    pub fn is_duplicate(&self, event: &GeoEvent, secondary: &[AcledEvent]) -> bool {
        self.has_match(event, &prepare_candidates(secondary))
    }

    fn has_match(&self, event: &GeoEvent, candidates: &[Candidate]) -> bool {
        let Some(at) = parse_timestamp(&event.date_start) else {
            return false;
        };
        if !event.lat.is_finite() || !event.lon.is_finite() {
            return false;
        }

        let band = self.config.max_distance_km / KM_PER_DEGREE_LAT;
        let start = candidates.partition_point(|c| c.lat < event.lat - band);
        let end = candidates.partition_point(|c| c.lat <= event.lat + band);

        candidates[start..end].iter().any(|candidate| {
            let days = (at - candidate.at).num_milliseconds().abs() as f64 / MS_PER_DAY;
            if days > self.config.max_days {
                return false;
            }
            if haversine_km(event.lat, event.lon, candidate.lat, candidate.lon)
                > self.config.max_distance_km
            {
                return false;
            }
            self.deaths_compatible(event.deaths_best as f64, candidate.deaths)
        })
    }

    fn deaths_compatible(&self, primary: f64, secondary: f64) -> bool {
        if primary == 0.0 && secondary == 0.0 {
            return true;
        }
        if primary > 0.0 && secondary > 0.0 {
            let ratio = primary / secondary;
            return ratio >= self.config.min_ratio && ratio <= self.config.max_ratio;
        }
        false
    }
}

/// Secondary events with usable coordinates and dates, sorted by latitude
fn prepare_candidates(secondary: &[AcledEvent]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = secondary
        .iter()
        .filter_map(|event| {
            Some(Candidate {
                lat: event.latitude?,
                lon: event.longitude?,
                at: parse_timestamp(&event.event_date)?,
                deaths: event.fatalities.unwrap_or(0.0),
            })
        })
        .collect();
    candidates.sort_by(|a, b| a.lat.total_cmp(&b.lat));
    candidates
}
