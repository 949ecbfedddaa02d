//! Geowatch SDK
//!
//! Client used by the dashboard to read the data proxy. Feeds are wrapped in
//! circuit breakers so an outage degrades to empty panels instead of a
//! request storm.

pub mod circuit_breaker;
pub mod client;
pub mod error;
pub mod types;

pub use circuit_breaker::{BreakerConfig, BreakerRegistry, BreakerStatus, CircuitBreaker, CircuitState};
pub use client::{DashboardClient, EXPOSURE_BATCH_SIZE};
pub use error::{Result, SdkError};
pub use geowatch_geo::format_population;
pub use types::*;
