//! Climate anomalies for the monitored zones, from the Open-Meteo archive

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use futures_util::future::join_all;
use geowatch_cache::{decode_as, CachePolicy, DecodeError, FetchError, Payload};
use geowatch_core::CacheKey;
use geowatch_geo::{ClimateAnomaly, MonitoredZone, MONITORED_ZONES};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{get_json, now_rfc3339};

pub const ENDPOINT: &str = "/api/climate-anomalies";
pub const LOOKBACK_DAYS: i64 = 30;

pub fn cache_key() -> CacheKey {
    CacheKey::new("climate:anomalies", "v1")
}

pub fn cache_policy() -> CachePolicy {
    let ttl = Duration::from_secs(6 * 60 * 60);
    CachePolicy::new(ENDPOINT, ttl).with_memory(4, ttl * 4)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateAnomaliesPayload {
    pub success: bool,
    pub anomalies: Vec<ClimateAnomaly>,
    pub timestamp: String,
}

impl Payload for ClimateAnomaliesPayload {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        decode_as(value, &["anomalies"])
    }
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    daily: DailySeries,
}

#[derive(Debug, Default, Deserialize)]
struct DailySeries {
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
}

pub async fn fetch_anomalies(http: &reqwest::Client, base: &str) -> Result<ClimateAnomaliesPayload, FetchError> {
    fetch_anomalies_until(http, base, Utc::now().date_naive()).await
}

/// All zones are requested concurrently; a zone that fails or has too few
/// samples is left out.
pub async fn fetch_anomalies_until(
    http: &reqwest::Client,
    base: &str,
    end: NaiveDate,
) -> Result<ClimateAnomaliesPayload, FetchError> {
    let start = end - ChronoDuration::days(LOOKBACK_DAYS);
    let lookups = MONITORED_ZONES
        .iter()
        .map(|zone| fetch_zone(http, base, zone, start, end));

    let anomalies: Vec<ClimateAnomaly> = join_all(lookups).await.into_iter().flatten().collect();
    info!(
        zones = MONITORED_ZONES.len(),
        anomalies = anomalies.len(),
        "computed climate anomalies"
    );

    Ok(ClimateAnomaliesPayload {
        success: true,
        anomalies,
        timestamp: now_rfc3339(),
    })
}

async fn fetch_zone(
    http: &reqwest::Client,
    base: &str,
    zone: &MonitoredZone,
    start: NaiveDate,
    end: NaiveDate,
) -> Option<ClimateAnomaly> {
    let url = format!(
        "{}/v1/archive?latitude={}&longitude={}&start_date={}&end_date={}&daily=temperature_2m_mean,precipitation_sum&timezone=UTC",
        base.trim_end_matches('/'),
        zone.lat,
        zone.lon,
        start,
        end
    );

    let body = match get_json(http, &url, "Open-Meteo archive").await {
        Ok(body) => body,
        Err(e) => {
            debug!(zone = zone.name, error = %e, "zone skipped");
            return None;
        }
    };
    let archive: ArchiveResponse = match serde_json::from_value(body) {
        Ok(archive) => archive,
        Err(e) => {
            debug!(zone = zone.name, error = %e, "zone payload unreadable");
            return None;
        }
    };

    ClimateAnomaly::from_daily_series(
        zone,
        &archive.daily.temperature_2m_mean,
        &archive.daily.precipitation_sum,
        format!("{} to {}", start, end),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_archive_nulls_are_kept_as_gaps() {
        let archive: ArchiveResponse = serde_json::from_value(json!({
            "daily": {
                "temperature_2m_mean": [1.5, null, 2.0],
                "precipitation_sum": []
            }
        }))
        .unwrap();
        assert_eq!(archive.daily.temperature_2m_mean, vec![Some(1.5), None, Some(2.0)]);
    }

    #[test]
    fn test_missing_daily_block_decodes_empty() {
        let archive: ArchiveResponse = serde_json::from_value(json!({"error": true})).unwrap();
        assert!(archive.daily.temperature_2m_mean.is_empty());
    }
}
