//! HTTP handlers for the data proxy

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use geowatch_cache::{CacheFailure, CacheOutcome, FetchError};
use geowatch_core::{CacheStatus, HealthStatus, ReadinessStatus};
use geowatch_geo::estimate_exposure;
use geowatch_telemetry::{EndpointSnapshot, LatencySummary};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::gate::{guarded, no_fields, Route};
use crate::sources::summarize::{self, SummarizeRequest, SummaryRecord};
use crate::sources::worldpop::{ExposureQuery, Mode};
use crate::sources::{ais, climate, ucdp, unhcr, worldpop};
use crate::AppState;

const X_CACHE: &str = "x-cache";

const UCDP_ROUTE: Route = Route::get(|| json!({ "data": [] }));
const UNHCR_ROUTE: Route = Route::get(|| json!({ "countries": [], "topFlows": [] }));
const CLIMATE_ROUTE: Route = Route::get(|| json!({ "anomalies": [] }));
const WORLDPOP_ROUTE: Route = Route::get(no_fields);
const AIS_ROUTE: Route = Route::get(no_fields);
const SUMMARIZE_ROUTE: Route = Route::post(|| json!({ "fallback": true }));

/// Browser cache lifetime for fresh and stale-fallback bodies
#[derive(Clone, Copy)]
struct BrowserCache {
    fresh_secs: u64,
    stale_secs: u64,
}

const HOURLY: BrowserCache = BrowserCache {
    fresh_secs: 3600,
    stale_secs: 600,
};
const DAILY: BrowserCache = BrowserCache {
    fresh_secs: 86400,
    stale_secs: 86400,
};
const AIS_BROWSER: BrowserCache = BrowserCache {
    fresh_secs: ais::TTL_SECS,
    stale_secs: ais::TTL_SECS,
};
const EXPOSURE_MAX_AGE: u64 = 3600;
const SUMMARY_MAX_AGE: u64 = 1800;

fn with_cache_headers(mut response: Response, max_age: Option<u64>, status: CacheStatus) -> Response {
    let headers = response.headers_mut();
    if let Some(max_age) = max_age {
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", max_age)) {
            headers.insert(header::CACHE_CONTROL, value);
        }
    }
    headers.insert(X_CACHE, HeaderValue::from_static(status.as_header()));
    response
}

fn cached_json<T: Serialize>(outcome: CacheOutcome<T>, browser: BrowserCache) -> Response {
    let max_age = if outcome.status.is_fallback() {
        browser.stale_secs
    } else {
        browser.fresh_secs
    };
    with_cache_headers(Json(outcome.value).into_response(), Some(max_age), outcome.status)
}

fn cache_failure(failure: CacheFailure, error_status: StatusCode, fields: Value) -> Response {
    let response = ApiError::from_fetch(&failure.error, error_status)
        .with_fields(fields)
        .into_response();
    with_cache_headers(response, None, failure.status)
}

// ============================================
// Data Endpoints
// ============================================

pub async fn ucdp_events(State(state): State<AppState>, method: Method, headers: HeaderMap) -> Response {
    guarded(&state, UCDP_ROUTE, &method, &headers, Some(&state.limiters.ucdp), || async {
        let http = state.http.clone();
        let base = state.config.ucdp_api_base.clone();
        let result = state
            .caches
            .ucdp
            .get_or_fetch(&ucdp::cache_key(), move || async move {
                ucdp::fetch_events(&http, &base).await
            })
            .await;

        match result {
            Ok(outcome) => cached_json(outcome, HOURLY),
            Err(failure) => cache_failure(failure, StatusCode::INTERNAL_SERVER_ERROR, (UCDP_ROUTE.empty_body)()),
        }
    })
    .await
}

pub async fn unhcr_population(State(state): State<AppState>, method: Method, headers: HeaderMap) -> Response {
    guarded(&state, UNHCR_ROUTE, &method, &headers, Some(&state.limiters.unhcr), || async {
        let http = state.http.clone();
        let base = state.config.unhcr_api_base.clone();
        let result = state
            .caches
            .unhcr
            .get_or_fetch(&unhcr::cache_key(), move || async move {
                unhcr::fetch_displacement(&http, &base).await
            })
            .await;

        match result {
            Ok(outcome) => cached_json(outcome, HOURLY),
            Err(failure) => cache_failure(failure, StatusCode::INTERNAL_SERVER_ERROR, (UNHCR_ROUTE.empty_body)()),
        }
    })
    .await
}

pub async fn climate_anomalies(State(state): State<AppState>, method: Method, headers: HeaderMap) -> Response {
    guarded(&state, CLIMATE_ROUTE, &method, &headers, Some(&state.limiters.climate), || async {
        let http = state.http.clone();
        let base = state.config.open_meteo_api_base.clone();
        let result = state
            .caches
            .climate
            .get_or_fetch(&climate::cache_key(), move || async move {
                climate::fetch_anomalies(&http, &base).await
            })
            .await;

        match result {
            Ok(outcome) => cached_json(outcome, HOURLY),
            Err(failure) => cache_failure(failure, StatusCode::INTERNAL_SERVER_ERROR, (CLIMATE_ROUTE.empty_body)()),
        }
    })
    .await
}

pub async fn worldpop_exposure(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<ExposureQuery>,
) -> Response {
    guarded(&state, WORLDPOP_ROUTE, &method, &headers, Some(&state.limiters.worldpop), || async {
        match query.mode() {
            None => ApiError::BadRequest("lat and lon required".to_string()).into_response(),
            Some(Mode::Exposure { lat, lon, radius_km }) => {
                let mut response = Json(estimate_exposure(lat, lon, radius_km)).into_response();
                if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", EXPOSURE_MAX_AGE)) {
                    response.headers_mut().insert(header::CACHE_CONTROL, value);
                }
                response
            }
            Some(Mode::Countries) => {
                let result = state
                    .caches
                    .countries
                    .get_or_fetch(&worldpop::cache_key(), worldpop::fetch_countries)
                    .await;
                match result {
                    Ok(outcome) => cached_json(outcome, DAILY),
                    Err(failure) => cache_failure(failure, StatusCode::INTERNAL_SERVER_ERROR, json!({ "countries": [] })),
                }
            }
        }
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
pub struct AisQuery {
    pub candidates: Option<String>,
}

pub async fn ais_snapshot(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<AisQuery>,
) -> Response {
    guarded(&state, AIS_ROUTE, &method, &headers, None, || async {
        let include_candidates = query.candidates.as_deref() == Some("true");
        let http = state.http.clone();
        let relay = state.config.relay_base_url();
        let result = state
            .caches
            .ais
            .get_or_fetch(&ais::cache_key(include_candidates), move || async move {
                ais::fetch_snapshot(&http, relay.as_deref(), include_candidates).await
            })
            .await;

        match result {
            Ok(outcome) => cached_json(outcome, AIS_BROWSER),
            Err(failure) => cache_failure(failure, StatusCode::BAD_GATEWAY, no_fields()),
        }
    })
    .await
}

pub async fn groq_summarize(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    guarded(&state, SUMMARIZE_ROUTE, &method, &headers, None, || async {
        match summarize_headlines(&state, &body).await {
            Ok(response) => response,
            Err(error) => error.with_fields(json!({ "fallback": true })).into_response(),
        }
    })
    .await
}

#[derive(Serialize)]
struct SummaryResponse<'a> {
    summary: &'a str,
    model: &'a str,
    provider: &'static str,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens: Option<u64>,
}

async fn summarize_headlines(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let Some(api_key) = state.config.groq_api_key.clone() else {
        return Err(ApiError::NotConfigured(summarize::NOT_CONFIGURED.to_string()));
    };

    let request: SummarizeRequest = serde_json::from_slice(body)
        .ok()
        .filter(|r: &SummarizeRequest| !r.headlines.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Headlines array required".to_string()))?;

    let http = state.http.clone();
    let url = state.config.groq_api_url.clone();
    let upstream_request = request.clone();
    let result = state
        .caches
        .summaries
        .get_or_fetch(&request.cache_key(), move || async move {
            summarize::generate(&http, &url, &api_key, &upstream_request).await
        })
        .await;

    match result {
        Ok(outcome) => {
            let record: &SummaryRecord = &outcome.value;
            let fresh = outcome.status == CacheStatus::Miss;
            let body = SummaryResponse {
                summary: &record.summary,
                model: &record.model,
                provider: if fresh { "groq" } else { "cache" },
                cached: !fresh,
                tokens: fresh.then_some(record.tokens),
            };
            Ok(with_cache_headers(
                Json(body).into_response(),
                Some(SUMMARY_MAX_AGE),
                outcome.status,
            ))
        }
        Err(failure) => Err(summary_error(&failure.error)),
    }
}

fn summary_error(error: &FetchError) -> ApiError {
    match error {
        FetchError::Upstream {
            status: Some(429), ..
        } => ApiError::RateLimited,
        FetchError::Upstream {
            status: Some(code), ..
        } => ApiError::upstream(
            StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY),
            "Groq API error",
        ),
        FetchError::Decode(_) => ApiError::upstream(StatusCode::INTERNAL_SERVER_ERROR, "Empty response"),
        FetchError::NotConfigured(message) => ApiError::NotConfigured(message.clone()),
        other => ApiError::upstream(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

// ============================================
// Health & Metrics Handlers
// ============================================

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.health_status())
}

pub async fn ready(State(state): State<AppState>) -> Json<ReadinessStatus> {
    Json(state.readiness())
}

/// Stats response
#[derive(Serialize)]
pub struct StatsResponse {
    pub uptime_secs: u64,
    pub durable_backend: &'static str,
    pub cache: BTreeMap<String, EndpointSnapshot>,
    pub upstream_latency: BTreeMap<String, LatencySummary>,
    pub in_flight: BTreeMap<&'static str, usize>,
    pub rate_limited_clients: BTreeMap<&'static str, usize>,
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let caches = &state.caches;
    let in_flight = BTreeMap::from([
        (ucdp::ENDPOINT, caches.ucdp.coalescer().in_flight()),
        (unhcr::ENDPOINT, caches.unhcr.coalescer().in_flight()),
        (climate::ENDPOINT, caches.climate.coalescer().in_flight()),
        (worldpop::ENDPOINT, caches.countries.coalescer().in_flight()),
        (ais::ENDPOINT, caches.ais.coalescer().in_flight()),
        (summarize::ENDPOINT, caches.summaries.coalescer().in_flight()),
    ]);

    let limiters = &state.limiters;
    let rate_limited_clients = BTreeMap::from([
        (ucdp::ENDPOINT, limiters.ucdp.len()),
        (unhcr::ENDPOINT, limiters.unhcr.len()),
        (climate::ENDPOINT, limiters.climate.len()),
        (worldpop::ENDPOINT, limiters.worldpop.len()),
    ]);

    Json(StatsResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        durable_backend: state.durable.backend(),
        cache: state.telemetry.snapshot(),
        upstream_latency: state.timings.summary(),
        in_flight,
        rate_limited_clients,
    })
}
