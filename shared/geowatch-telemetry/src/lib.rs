//! Geowatch Telemetry
//!
//! Structured logging setup, metric primitives and the cache-status
//! telemetry hook every proxy endpoint reports through.

mod cache_telemetry;
mod config;
mod metrics;
mod tracing_setup;

pub use cache_telemetry::{CacheTelemetry, EndpointSnapshot, LatencySummary, UpstreamTimings};
pub use config::TelemetryConfig;
pub use metrics::{Counter, Histogram};
pub use tracing_setup::{default_directives, init_tracing};

/// Initialize logging for a service from the environment
pub fn init(service_name: &str) -> Result<(), TelemetryError> {
    let config = TelemetryConfig::from_env();
    init_tracing(service_name, &config)
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),

    #[error("Invalid log filter {0}")]
    InvalidFilter(String),
}
