//! Cache-status telemetry
//!
//! Every proxy response is tagged with an `X-Cache` status; the same status
//! is reported here before the response is built so operators can see hit
//! ratios and fallback rates per endpoint.

use dashmap::DashMap;
use geowatch_core::CacheStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::{Counter, Histogram};

/// Per-endpoint, per-status outcome counters
#[derive(Clone, Default)]
pub struct CacheTelemetry {
    counters: Arc<DashMap<(String, CacheStatus), Counter>>,
}

impl CacheTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one request to `endpoint`.
    pub fn record(&self, endpoint: &str, status: CacheStatus) {
        self.counters
            .entry((endpoint.to_string(), status))
            .or_insert_with(|| Counter::new(&format!("{}:{}", endpoint, status)))
            .inc();

        match status {
            CacheStatus::Error | CacheStatus::NoRelayConfig => {
                tracing::warn!(endpoint, cache = %status, "cache outcome")
            }
            CacheStatus::Stale | CacheStatus::MemoryErrorFallback => {
                tracing::info!(endpoint, cache = %status, "served fallback")
            }
            _ => tracing::debug!(endpoint, cache = %status, "cache outcome"),
        }
    }

    pub fn count(&self, endpoint: &str, status: CacheStatus) -> u64 {
        self.counters
            .get(&(endpoint.to_string(), status))
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Counts grouped by endpoint, for the stats route
    pub fn snapshot(&self) -> BTreeMap<String, EndpointSnapshot> {
        let mut out: BTreeMap<String, EndpointSnapshot> = BTreeMap::new();
        for entry in self.counters.iter() {
            let (endpoint, status) = entry.key();
            let snap = out.entry(endpoint.clone()).or_default();
            snap.total += entry.value().get();
            snap.by_status.insert(status.as_header().to_string(), entry.value().get());
        }
        out
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointSnapshot {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
}

/// Upstream fetch latency per endpoint
#[derive(Clone, Default)]
pub struct UpstreamTimings {
    histograms: Arc<DashMap<String, Histogram>>,
}

impl UpstreamTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, endpoint: &str, elapsed: Duration) {
        self.histograms
            .entry(endpoint.to_string())
            .or_insert_with(|| Histogram::new(endpoint))
            .record(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn summary(&self) -> BTreeMap<String, LatencySummary> {
        self.histograms
            .iter()
            .map(|h| {
                (
                    h.key().clone(),
                    LatencySummary {
                        samples: h.count(),
                        mean_ms: h.mean(),
                        p50_ms: h.percentile(50.0),
                        p95_ms: h.percentile(95.0),
                    },
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
}
