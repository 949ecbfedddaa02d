//! Geowatch Data Proxy
//!
//! Read-through caching proxy in front of the crisis and geospatial feeds
//! the dashboard consumes:
//! - UCDP georeferenced conflict events
//! - UNHCR displacement totals and flows
//! - Open-Meteo climate anomalies for monitored zones
//! - WorldPop-style population exposure
//! - AIS vessel snapshots from the websocket relay
//! - Groq headline summaries
//!
//! Every data endpoint is gated by CORS, method and per-client rate checks
//! and served through a [`geowatch_cache::ResilientCache`].

pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod routes;
pub mod security;
pub mod service;
pub mod sources;
pub mod state;

pub use config::Config;
pub use error::{ApiError, Result};
pub use routes::create_router;
pub use service::DataProxyService;
pub use state::{AppState, Limiters};
