//! UCDP Georeferenced Event Dataset
//!
//! The GED API pages events oldest first, so the walk starts at the last
//! page and moves backwards until it has covered a trailing year of data or
//! hit the page cap.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use geowatch_cache::{decode_as, CachePolicy, DecodeError, FetchError, Payload};
use geowatch_core::CacheKey;
use geowatch_geo::lenient::{coerce_count, coerce_f64, coerce_string};
use geowatch_geo::{parse_timestamp, GeoEvent, ViolenceType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::time::Duration;
use tracing::{debug, info};

use super::{get_json, now_rfc3339};

pub const ENDPOINT: &str = "/api/ucdp-events";
pub const PAGE_SIZE: u32 = 1000;
pub const MAX_PAGES: usize = 12;
pub const TRAILING_WINDOW_DAYS: i64 = 365;

const SIDE_MAX_CHARS: usize = 200;
const SOURCE_MAX_CHARS: usize = 300;

pub fn cache_key() -> CacheKey {
    CacheKey::new("ucdp:gedevents", "v2")
}

pub fn cache_policy() -> CachePolicy {
    CachePolicy::new(ENDPOINT, Duration::from_secs(6 * 60 * 60))
        .with_memory(4, Duration::from_secs(24 * 60 * 60))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UcdpEventsPayload {
    pub success: bool,
    pub count: usize,
    pub data: Vec<GeoEvent>,
    pub version: String,
    pub cached_at: String,
}

impl Payload for UcdpEventsPayload {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        decode_as(value, &["data"])
    }
}

/// Dataset versions to probe, newest first, without duplicates
pub fn version_candidates(year: i32) -> Vec<String> {
    let short = year - 2000;
    let mut candidates: Vec<String> = Vec::with_capacity(4);
    for candidate in [
        format!("{}.1", short),
        format!("{}.1", short - 1),
        "25.1".to_string(),
        "24.1".to_string(),
    ] {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

pub async fn fetch_events(http: &reqwest::Client, base: &str) -> Result<UcdpEventsPayload, FetchError> {
    fetch_events_at(http, base, Utc::now()).await
}

/// Fetch with an explicit clock, which decides the version candidates
pub async fn fetch_events_at(
    http: &reqwest::Client,
    base: &str,
    now: DateTime<Utc>,
) -> Result<UcdpEventsPayload, FetchError> {
    let (version, page0) = discover_version(http, base, now.year()).await?;

    let total_pages = page0
        .get("TotalPages")
        .and_then(coerce_f64)
        .map(|n| n as usize)
        .unwrap_or(1)
        .max(1);
    let newest_page = total_pages - 1;

    let mut raw_events: Vec<Value> = Vec::new();
    let mut latest: Option<DateTime<Utc>> = None;
    let mut pages_read = 0;

    for offset in 0..MAX_PAGES.min(total_pages) {
        let page = newest_page - offset;
        let page_body = if page == 0 {
            page0.clone()
        } else {
            fetch_page(http, base, &version, page).await?
        };
        pages_read += 1;

        let events = result_array(&page_body);
        let (oldest_on_page, newest_on_page) = date_bounds(&events);
        if latest.is_none() {
            latest = newest_on_page;
        }
        raw_events.extend(events);

        if let (Some(latest), Some(oldest)) = (latest, oldest_on_page) {
            if oldest < latest - trailing_window() {
                debug!(page, "reached the end of the trailing window");
                break;
            }
        }
    }

    let data = normalize_events(&raw_events, latest);
    info!(
        version = %version,
        pages = pages_read,
        events = data.len(),
        "fetched UCDP events"
    );

    Ok(UcdpEventsPayload {
        success: true,
        count: data.len(),
        data,
        version,
        cached_at: now_rfc3339(),
    })
}

async fn discover_version(
    http: &reqwest::Client,
    base: &str,
    year: i32,
) -> Result<(String, Value), FetchError> {
    for version in version_candidates(year) {
        match fetch_page(http, base, &version, 0).await {
            Ok(page0) if page0.get("Result").map(Value::is_array).unwrap_or(false) => {
                return Ok((version, page0));
            }
            Ok(_) => debug!(version = %version, "candidate version has no Result array"),
            Err(e) => debug!(version = %version, error = %e, "candidate version unavailable"),
        }
    }
    Err(FetchError::upstream(
        "Unable to fetch UCDP GED metadata from known API versions",
    ))
}

async fn fetch_page(
    http: &reqwest::Client,
    base: &str,
    version: &str,
    page: usize,
) -> Result<Value, FetchError> {
    let url = format!(
        "{}/api/gedevents/{}?pagesize={}&page={}",
        base.trim_end_matches('/'),
        version,
        PAGE_SIZE,
        page
    );
    get_json(http, &url, &format!("UCDP GED API ({}, page {})", version, page)).await
}

fn trailing_window() -> ChronoDuration {
    ChronoDuration::days(TRAILING_WINDOW_DAYS)
}

fn result_array(page: &Value) -> Vec<Value> {
    page.get("Result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn event_date(event: &Value) -> Option<DateTime<Utc>> {
    event
        .get("date_start")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
}

/// Oldest and newest parseable `date_start` on a page
fn date_bounds(events: &[Value]) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let dates = events.iter().filter_map(event_date);
    dates.fold((None, None), |(oldest, newest), date| {
        (
            Some(oldest.map_or(date, |o: DateTime<Utc>| o.min(date))),
            Some(newest.map_or(date, |n: DateTime<Utc>| n.max(date))),
        )
    })
}

/// Keep the trailing window, normalise, newest first.
///
/// Without any parseable date every event is kept; otherwise events with
/// unparseable dates are dropped.
fn normalize_events(raw: &[Value], latest: Option<DateTime<Utc>>) -> Vec<GeoEvent> {
    let cutoff = latest.map(|l| l - trailing_window());

    let mut keyed: Vec<(i64, GeoEvent)> = raw
        .iter()
        .filter_map(|event| {
            let date = event_date(event);
            if let Some(cutoff) = cutoff {
                match date {
                    Some(d) if d >= cutoff => {}
                    _ => return None,
                }
            }
            let sort_key = date.map(|d| d.timestamp_millis()).unwrap_or(0);
            Some((sort_key, normalize_event(event)))
        })
        .collect();

    keyed.sort_by_key(|(ms, _)| Reverse(*ms));
    keyed.into_iter().map(|(_, event)| event).collect()
}

fn normalize_event(raw: &Value) -> GeoEvent {
    let number = |field: &str| raw.get(field).and_then(coerce_f64).unwrap_or(0.0);
    let violence_code = raw
        .get("type_of_violence")
        .and_then(coerce_f64)
        .map(|code| code as i64)
        .unwrap_or(0);

    GeoEvent {
        id: coerce_string(raw.get("id")),
        date_start: coerce_string(raw.get("date_start")),
        date_end: coerce_string(raw.get("date_end")),
        lat: number("latitude"),
        lon: number("longitude"),
        country: coerce_string(raw.get("country")),
        side_a: truncate_chars(coerce_string(raw.get("side_a")), SIDE_MAX_CHARS),
        side_b: truncate_chars(coerce_string(raw.get("side_b")), SIDE_MAX_CHARS),
        deaths_best: coerce_count(raw.get("best")),
        deaths_low: coerce_count(raw.get("low")),
        deaths_high: coerce_count(raw.get("high")),
        violence_type: ViolenceType::from_code(violence_code),
        source_original: truncate_chars(coerce_string(raw.get("source_original")), SOURCE_MAX_CHARS),
    }
}

fn truncate_chars(value: String, max: usize) -> String {
    if value.chars().count() <= max {
        return value;
    }
    value.chars().take(max).collect()
}
