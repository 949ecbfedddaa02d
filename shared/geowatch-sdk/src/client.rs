//! Data proxy client
//!
//! Each feed goes through its own circuit breaker; public fetchers never
//! fail and return an empty response while the feed is unavailable.

use futures_util::future::join_all;
use geowatch_geo::{
    radius_for_event_type, AcledEvent, CountryPopulation, Deduplicator, ExposureEstimate,
    GeoEvent, PopulationExposure,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::circuit_breaker::{BreakerConfig, BreakerRegistry, BreakerStatus};
use crate::types::{
    ClimateAnomaliesResponse, CountriesResponse, DisplacementResponse, ExposureTarget,
    SummaryResponse, UcdpEventsResponse,
};
use crate::{Result, SdkError};

/// Concurrent exposure lookups per batch
pub const EXPOSURE_BATCH_SIZE: usize = 10;

pub const UCDP_FEED: &str = "UCDP Events";
pub const DISPLACEMENT_FEED: &str = "UNHCR Displacement";
pub const CLIMATE_FEED: &str = "Climate Anomalies";
pub const COUNTRIES_FEED: &str = "WorldPop Countries";
pub const SUMMARY_FEED: &str = "Headline Summaries";

pub struct DashboardClient {
    http: reqwest::Client,
    base_url: String,
    breakers: BreakerRegistry,
    dedup: Deduplicator,
}

impl DashboardClient {
    /// Create a client for the proxy at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Self::with_client(http, base_url, BreakerConfig::default())
    }

    pub fn with_client(http: reqwest::Client, base_url: &str, breakers: BreakerConfig) -> Result<Self> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SdkError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            breakers: BreakerRegistry::new(breakers),
            dedup: Deduplicator::default(),
        })
    }

    pub fn with_deduplicator(mut self, dedup: Deduplicator) -> Self {
        self.dedup = dedup;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SdkError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn fetch_ucdp_events(&self) -> UcdpEventsResponse {
        self.breakers
            .get_or_create(UCDP_FEED)
            .execute(
                || self.get_json::<UcdpEventsResponse>("/api/ucdp-events"),
                UcdpEventsResponse::default(),
            )
            .await
    }

    /// UCDP events minus those already reported by the secondary source
    pub async fn fetch_deduplicated_events(&self, secondary: &[AcledEvent]) -> Vec<GeoEvent> {
        let response = self.fetch_ucdp_events().await;
        self.dedup.deduplicate(&response.data, secondary)
    }

    pub async fn fetch_displacement(&self) -> DisplacementResponse {
        self.breakers
            .get_or_create(DISPLACEMENT_FEED)
            .execute(
                || self.get_json::<DisplacementResponse>("/api/unhcr-population"),
                DisplacementResponse::default(),
            )
            .await
    }

    pub async fn fetch_climate_anomalies(&self) -> ClimateAnomaliesResponse {
        self.breakers
            .get_or_create(CLIMATE_FEED)
            .execute(
                || self.get_json::<ClimateAnomaliesResponse>("/api/climate-anomalies"),
                ClimateAnomaliesResponse::default(),
            )
            .await
    }

    pub async fn fetch_country_populations(&self) -> Vec<CountryPopulation> {
        self.breakers
            .get_or_create(COUNTRIES_FEED)
            .execute(
                || self.get_json::<CountriesResponse>("/api/worldpop-exposure?mode=countries"),
                CountriesResponse::default(),
            )
            .await
            .countries
    }

    /// Exposure around a point; `None` on any failure. Not breaker-guarded,
    /// a bad point must not trip the feed for every other event.
    pub async fn fetch_exposure(&self, lat: f64, lon: f64, radius_km: f64) -> Option<ExposureEstimate> {
        let path = format!(
            "/api/worldpop-exposure?mode=exposure&lat={}&lon={}&radius={}",
            lat, lon, radius_km
        );
        match self.get_json::<ExposureEstimate>(&path).await {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                tracing::debug!(lat, lon, error = %e, "exposure lookup failed");
                None
            }
        }
    }

    /// Attach exposure estimates to events, in batches of
    /// [`EXPOSURE_BATCH_SIZE`], largest exposure first. Failed lookups are
    /// left out.
    pub async fn enrich_events_with_exposure(&self, events: &[ExposureTarget]) -> Vec<PopulationExposure> {
        let mut results = Vec::with_capacity(events.len());

        for batch in events.chunks(EXPOSURE_BATCH_SIZE) {
            let lookups = batch.iter().map(|event| async move {
                let radius = radius_for_event_type(&event.event_type);
                let estimate = self.fetch_exposure(event.lat, event.lon, radius).await?;
                Some(PopulationExposure {
                    event_id: event.id.clone(),
                    event_name: event.name.clone(),
                    event_type: event.event_type.clone(),
                    lat: event.lat,
                    lon: event.lon,
                    exposed_population: estimate.exposed_population,
                    exposure_radius_km: radius,
                })
            });
            results.extend(join_all(lookups).await.into_iter().flatten());
        }

        results.sort_by(|a, b| b.exposed_population.cmp(&a.exposed_population));
        results
    }

    /// Summarize up to eight headlines; `None` when the service declines.
    pub async fn summarize(&self, headlines: &[String], mode: &str) -> Option<SummaryResponse> {
        let body = json!({ "headlines": headlines, "mode": mode });
        self.breakers
            .get_or_create(SUMMARY_FEED)
            .execute(
                || async {
                    let response = self
                        .http
                        .post(format!("{}/api/groq-summarize", self.base_url))
                        .json(&body)
                        .send()
                        .await?;
                    if !response.status().is_success() {
                        return Err(SdkError::Status(response.status().as_u16()));
                    }
                    let summary: SummaryResponse = response.json().await?;
                    Ok(Some(summary))
                },
                None,
            )
            .await
    }

    pub fn breaker_statuses(&self) -> Vec<BreakerStatus> {
        self.breakers.statuses()
    }

    /// Feeds currently served from fallbacks
    pub fn unhealthy_feeds(&self) -> Vec<BreakerStatus> {
        self.breakers.unhealthy()
    }
}
