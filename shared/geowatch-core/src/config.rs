//! Configuration shared by every Geowatch binary

use crate::error::{GeowatchError, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub http_port: u16,
    pub log_level: String,
    pub json_logs: bool,
    /// Grace period for in-flight requests after a shutdown signal
    pub shutdown_grace_secs: u64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "geowatch".to_string()),
            http_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|e| GeowatchError::Config(format!("Invalid PORT: {}", e)))?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("JSON_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            shutdown_grace_secs: env::var("SHUTDOWN_GRACE_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|e| GeowatchError::Config(format!("Invalid SHUTDOWN_GRACE_SECS: {}", e)))?,
        })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "geowatch".to_string(),
            http_port: 8080,
            log_level: "info".to_string(),
            json_logs: true,
            shutdown_grace_secs: 5,
        }
    }
}
