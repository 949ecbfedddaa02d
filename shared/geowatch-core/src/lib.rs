//! Geowatch Core - Shared infrastructure for the crisis data proxies
//!
//! This crate provides:
//! - Standard service trait and runtime every Geowatch binary runs under
//! - Cache domain types (`CacheKey`, `CacheStatus`)
//! - The common error taxonomy
//! - Service-level configuration

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use domain::{CacheKey, CacheStatus};
pub use error::{GeowatchError, Result};
pub use service::{DependencyStatus, GeowatchService, HealthStatus, MicroserviceRuntime, ReadinessStatus};
