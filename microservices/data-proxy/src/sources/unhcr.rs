//! UNHCR population statistics, aggregated into displacement by country

use chrono::{Datelike, Utc};
use geowatch_cache::{decode_as, CachePolicy, DecodeError, FetchError, Payload};
use geowatch_core::CacheKey;
use geowatch_geo::lenient::coerce_f64;
use geowatch_geo::{
    aggregate_displacement, CountryDisplacement, DisplacementFlow, GlobalDisplacementTotals,
    UnhcrRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{get_json, now_rfc3339};

pub const ENDPOINT: &str = "/api/unhcr-population";
pub const PAGE_LIMIT: usize = 10_000;
pub const MAX_PAGES: u32 = 25;
/// Years tried, counting back from the current one
pub const YEARS_BACK: i32 = 2;

pub fn cache_key() -> CacheKey {
    CacheKey::new("unhcr:population", "v2")
}

pub fn cache_policy() -> CachePolicy {
    let ttl = Duration::from_secs(24 * 60 * 60);
    CachePolicy::new(ENDPOINT, ttl).with_memory(4, ttl * 4)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacementPayload {
    pub success: bool,
    pub year: i32,
    pub global_totals: GlobalDisplacementTotals,
    pub countries: Vec<CountryDisplacement>,
    pub top_flows: Vec<DisplacementFlow>,
    #[serde(rename = "cached_at")]
    pub cached_at: String,
}

impl Payload for DisplacementPayload {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        decode_as(value, &["countries"])
    }
}

pub async fn fetch_displacement(http: &reqwest::Client, base: &str) -> Result<DisplacementPayload, FetchError> {
    fetch_displacement_for(http, base, Utc::now().year()).await
}

/// Use the newest of `current_year` and the two years before it that has
/// any rows. A year whose API call fails is skipped.
pub async fn fetch_displacement_for(
    http: &reqwest::Client,
    base: &str,
    current_year: i32,
) -> Result<DisplacementPayload, FetchError> {
    let mut rows: Vec<Value> = Vec::new();
    let mut year_used = None;

    for year in (current_year - YEARS_BACK..=current_year).rev() {
        let Some(items) = fetch_year_items(http, base, year).await? else {
            debug!(year, "UNHCR year unavailable");
            continue;
        };
        rows = items;
        if !rows.is_empty() {
            year_used = Some(year);
            break;
        }
    }

    let records: Vec<UnhcrRecord> = rows.iter().map(UnhcrRecord::from_value).collect();
    let summary = aggregate_displacement(&records);
    let year = year_used.unwrap_or(current_year);
    info!(year, rows = records.len(), countries = summary.countries.len(), "aggregated UNHCR population");

    Ok(DisplacementPayload {
        success: true,
        year,
        global_totals: summary.global_totals,
        countries: summary.countries,
        top_flows: summary.top_flows,
        cached_at: now_rfc3339(),
    })
}

/// All rows for one year; `None` when the API answers with an error status.
pub async fn fetch_year_items(
    http: &reqwest::Client,
    base: &str,
    year: i32,
) -> Result<Option<Vec<Value>>, FetchError> {
    let mut items = Vec::new();

    for page in 1..=MAX_PAGES {
        let url = format!(
            "{}/population/v1/population/?year={}&limit={}&page={}",
            base.trim_end_matches('/'),
            year,
            PAGE_LIMIT,
            page
        );
        let body = match get_json(http, &url, "UNHCR API").await {
            Ok(body) => body,
            Err(e) if e.upstream_status().is_some() => return Ok(None),
            Err(e) => return Err(e),
        };

        let page_items = body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if page_items.is_empty() {
            break;
        }
        let short_page = page_items.len() < PAGE_LIMIT;
        items.extend(page_items);

        match body.get("maxPages").and_then(coerce_f64) {
            Some(max_pages) if max_pages > 0.0 => {
                if f64::from(page) >= max_pages {
                    break;
                }
            }
            _ if short_page => break,
            _ => {}
        }
    }

    Ok(Some(items))
}
