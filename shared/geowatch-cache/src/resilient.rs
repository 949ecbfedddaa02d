//! The cache / coalesce / fallback state machine shared by every endpoint.
//!
//! Read order: durable tier, then in-process tier, then one coalesced
//! upstream fetch. A failed fetch falls back to a stale in-process copy when
//! there is one. Missing configuration is never masked by stale data.

use geowatch_core::{CacheKey, CacheStatus};
use geowatch_telemetry::{CacheTelemetry, UpstreamTimings};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{Coalescer, DurableStore, FetchError, MemoryTier, MemoryTierConfig, Payload};

/// Per-endpoint cache behaviour
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Endpoint label used for telemetry and logs
    pub endpoint: &'static str,
    /// Freshness for both tiers
    pub ttl: Duration,
    pub memory: MemoryTierConfig,
    /// Marker reported when a stale copy is served after an upstream failure
    pub fallback_status: CacheStatus,
}

impl CachePolicy {
    pub fn new(endpoint: &'static str, ttl: Duration) -> Self {
        Self {
            endpoint,
            ttl,
            memory: MemoryTierConfig::default(),
            fallback_status: CacheStatus::Stale,
        }
    }

    pub fn with_memory(mut self, max_entries: usize, max_age: Duration) -> Self {
        self.memory = MemoryTierConfig {
            max_entries,
            max_age,
        };
        self
    }

    pub fn with_fallback_status(mut self, status: CacheStatus) -> Self {
        self.fallback_status = status;
        self
    }
}

/// A value served to the caller and the tier it came from
#[derive(Debug, Clone)]
pub struct CacheOutcome<T> {
    pub value: T,
    pub status: CacheStatus,
}

/// No value could be served
#[derive(Debug, Clone)]
pub struct CacheFailure {
    /// `NoRelayConfig` or `Error`
    pub status: CacheStatus,
    pub error: FetchError,
}

pub struct ResilientCache<T> {
    policy: CachePolicy,
    durable: Arc<dyn DurableStore>,
    memory: Arc<MemoryTier<T>>,
    coalescer: Coalescer<T>,
    telemetry: CacheTelemetry,
    timings: UpstreamTimings,
}

impl<T: Payload> ResilientCache<T> {
    pub fn new(
        policy: CachePolicy,
        durable: Arc<dyn DurableStore>,
        telemetry: CacheTelemetry,
        timings: UpstreamTimings,
    ) -> Self {
        Self {
            memory: Arc::new(MemoryTier::new(policy.memory)),
            coalescer: Coalescer::new(),
            policy,
            durable,
            telemetry,
            timings,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn memory(&self) -> &MemoryTier<T> {
        &self.memory
    }

    pub fn coalescer(&self) -> &Coalescer<T> {
        &self.coalescer
    }

    /// Serve `key` from cache, or run `fetch` once for all concurrent
    /// callers. The outcome is reported to telemetry before returning.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<CacheOutcome<T>, CacheFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let result = self.resolve(key, fetch).await;
        let status = match &result {
            Ok(outcome) => outcome.status,
            Err(failure) => failure.status,
        };
        self.telemetry.record(self.policy.endpoint, status);
        result
    }

    async fn resolve<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<CacheOutcome<T>, CacheFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        if let Some(value) = self.read_durable(key).await {
            self.memory.insert(key.as_str(), value.clone());
            return Ok(CacheOutcome {
                value,
                status: CacheStatus::RedisHit,
            });
        }

        if let Some(value) = self.memory.get(key.as_str(), self.policy.ttl) {
            return Ok(CacheOutcome {
                value,
                status: CacheStatus::MemoryHit,
            });
        }

        let endpoint = self.policy.endpoint;
        let ttl = self.policy.ttl;
        let memory = Arc::clone(&self.memory);
        let durable = Arc::clone(&self.durable);
        let timings = self.timings.clone();
        let store_key = key.as_str().to_string();

        let fetched = self
            .coalescer
            .run(key.as_str(), move || {
                let upstream = fetch();
                async move {
                    let started = Instant::now();
                    let result = upstream.await;
                    timings.record(endpoint, started.elapsed());
                    if let Ok(value) = &result {
                        memory.insert(&store_key, value.clone());
                        spawn_durable_write(durable, store_key, value, ttl);
                    }
                    result
                }
            })
            .await;

        match fetched {
            Ok(value) => Ok(CacheOutcome {
                value,
                status: CacheStatus::Miss,
            }),
            Err(error @ FetchError::NotConfigured(_)) => Err(CacheFailure {
                status: CacheStatus::NoRelayConfig,
                error,
            }),
            Err(error) => match self.memory.get_stale(key.as_str()) {
                Some(value) => {
                    warn!(
                        endpoint,
                        key = %key,
                        error = %error,
                        "upstream failed, serving stale copy"
                    );
                    Ok(CacheOutcome {
                        value,
                        status: self.policy.fallback_status,
                    })
                }
                None => Err(CacheFailure {
                    status: CacheStatus::Error,
                    error,
                }),
            },
        }
    }

    async fn read_durable(&self, key: &CacheKey) -> Option<T> {
        let raw = match self.durable.get_json(key.as_str()).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(
                    endpoint = self.policy.endpoint,
                    backend = self.durable.backend(),
                    error = %e,
                    "durable cache read failed"
                );
                return None;
            }
        };

        match T::decode(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    endpoint = self.policy.endpoint,
                    key = %key,
                    error = %e,
                    "discarding durable entry that failed validation"
                );
                None
            }
        }
    }
}

fn spawn_durable_write<T: Payload>(
    durable: Arc<dyn DurableStore>,
    key: String,
    value: &T,
    ttl: Duration,
) {
    let encoded = match serde_json::to_value(value) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(key = %key, error = %e, "failed to encode payload for durable cache");
            return;
        }
    };

    tokio::spawn(async move {
        match durable.set_json(&key, &encoded, ttl).await {
            Ok(()) => debug!(key = %key, backend = durable.backend(), "durable cache written"),
            Err(e) => warn!(key = %key, error = %e, "durable cache write failed"),
        }
    });
}
