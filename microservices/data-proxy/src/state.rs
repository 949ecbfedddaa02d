//! Application state shared across handlers

use geowatch_cache::{DurableStore, LocalStore, NullStore, ResilientCache, UpstashStore};
use geowatch_core::{DependencyStatus, HealthStatus, ReadinessStatus};
use geowatch_telemetry::{CacheTelemetry, UpstreamTimings};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::security::{CorsPolicy, RateLimitConfig, RateLimiter};
use crate::sources::ais::{self, AisSnapshot};
use crate::sources::climate::{self, ClimateAnomaliesPayload};
use crate::sources::summarize::{self, SummaryRecord};
use crate::sources::ucdp::{self, UcdpEventsPayload};
use crate::sources::unhcr::{self, DisplacementPayload};
use crate::sources::worldpop::{self, CountriesPayload};

pub const SERVICE_ID: &str = "data-proxy";

/// One resilient cache per endpoint
pub struct Caches {
    pub ucdp: ResilientCache<UcdpEventsPayload>,
    pub unhcr: ResilientCache<DisplacementPayload>,
    pub climate: ResilientCache<ClimateAnomaliesPayload>,
    pub countries: ResilientCache<CountriesPayload>,
    pub ais: ResilientCache<AisSnapshot>,
    pub summaries: ResilientCache<SummaryRecord>,
}

impl Caches {
    fn new(durable: Arc<dyn DurableStore>, telemetry: &CacheTelemetry, timings: &UpstreamTimings) -> Self {
        Self {
            ucdp: ResilientCache::new(ucdp::cache_policy(), Arc::clone(&durable), telemetry.clone(), timings.clone()),
            unhcr: ResilientCache::new(unhcr::cache_policy(), Arc::clone(&durable), telemetry.clone(), timings.clone()),
            climate: ResilientCache::new(climate::cache_policy(), Arc::clone(&durable), telemetry.clone(), timings.clone()),
            countries: ResilientCache::new(worldpop::cache_policy(), Arc::clone(&durable), telemetry.clone(), timings.clone()),
            ais: ResilientCache::new(ais::cache_policy(), Arc::clone(&durable), telemetry.clone(), timings.clone()),
            summaries: ResilientCache::new(summarize::cache_policy(), durable, telemetry.clone(), timings.clone()),
        }
    }
}

/// Per-endpoint client limits. AIS and summaries are not limited here.
pub struct Limiters {
    pub ucdp: RateLimiter,
    pub unhcr: RateLimiter,
    pub climate: RateLimiter,
    pub worldpop: RateLimiter,
}

impl Default for Limiters {
    fn default() -> Self {
        Self {
            ucdp: RateLimiter::new(RateLimitConfig::per_minute(15)),
            unhcr: RateLimiter::new(RateLimitConfig::per_minute(20)),
            climate: RateLimiter::new(RateLimitConfig::per_minute(15)),
            worldpop: RateLimiter::new(RateLimitConfig::per_minute(30)),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub durable: Arc<dyn DurableStore>,
    pub caches: Arc<Caches>,
    pub limiters: Arc<Limiters>,
    pub cors: Arc<CorsPolicy>,
    pub telemetry: CacheTelemetry,
    pub timings: UpstreamTimings,
    pub started_at: Instant,
}

impl AppState {
    /// Build state with the durable tier chosen from configuration
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = build_http_client(&config)?;
        let durable = durable_store(&config, &http);
        Self::assemble(config, http, durable, Limiters::default())
    }

    /// Build state around a caller-supplied durable tier and limits
    pub fn with_parts(
        config: Config,
        durable: Arc<dyn DurableStore>,
        limiters: Limiters,
    ) -> anyhow::Result<Self> {
        let http = build_http_client(&config)?;
        Self::assemble(config, http, durable, limiters)
    }

    fn assemble(
        config: Config,
        http: reqwest::Client,
        durable: Arc<dyn DurableStore>,
        limiters: Limiters,
    ) -> anyhow::Result<Self> {
        let telemetry = CacheTelemetry::new();
        let timings = UpstreamTimings::new();
        let cors = CorsPolicy::new(&config.allowed_origins)?;
        let caches = Caches::new(Arc::clone(&durable), &telemetry, &timings);

        Ok(Self {
            config: Arc::new(config),
            http,
            durable,
            caches: Arc::new(caches),
            limiters: Arc::new(limiters),
            cors: Arc::new(cors),
            telemetry,
            timings,
            started_at: Instant::now(),
        })
    }

    pub fn health_status(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: SERVICE_ID.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Every dependency is optional: endpoints without theirs answer 503
    /// and the rest keep serving.
    pub fn readiness(&self) -> ReadinessStatus {
        let dependencies = vec![
            DependencyStatus {
                name: format!("durable-cache:{}", self.durable.backend()),
                available: self.durable.is_shared(),
                required: false,
            },
            DependencyStatus {
                name: "ais-relay".to_string(),
                available: self.config.relay_base_url().is_some(),
                required: false,
            },
            DependencyStatus {
                name: "groq".to_string(),
                available: self.config.groq_api_key.is_some(),
                required: false,
            },
        ];
        let ready = dependencies.iter().all(|d| d.available || !d.required);
        ReadinessStatus { ready, dependencies }
    }
}

fn build_http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(config.upstream_timeout())
        .user_agent(concat!("geowatch-data-proxy/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Upstash when both URL and token are set, a process-local store when
/// `LOCAL_DURABLE_CACHE` is on, otherwise no durable tier.
pub fn durable_store(config: &Config, http: &reqwest::Client) -> Arc<dyn DurableStore> {
    let store: Arc<dyn DurableStore> = match (&config.upstash_url, &config.upstash_token) {
        (Some(url), Some(token)) => Arc::new(UpstashStore::new(http.clone(), url, token)),
        _ if config.local_durable_cache => Arc::new(LocalStore::new()),
        _ => Arc::new(NullStore),
    };
    info!(backend = store.backend(), shared = store.is_shared(), "durable cache tier selected");
    store
}
