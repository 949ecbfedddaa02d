//! Log filter and subscriber installation
//!
//! Without `RUST_LOG`, dependencies log at `warn` while the service crate and
//! the shared geowatch crates log at the configured level.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

const DEPENDENCY_LEVEL: &str = "warn";

const WORKSPACE_TARGETS: &[&str] = &[
    "geowatch_core",
    "geowatch_cache",
    "geowatch_sdk",
    "geowatch_geo",
    "geowatch_telemetry",
];

/// Filter directives for a service when no override is configured
pub fn default_directives(service_name: &str, config: &TelemetryConfig) -> String {
    let level = &config.log_level;
    let service_target = service_name.replace('-', "_");

    let mut directives = vec![
        DEPENDENCY_LEVEL.to_string(),
        format!("{}={}", service_target, level),
    ];
    directives.extend(
        WORKSPACE_TARGETS
            .iter()
            .filter(|target| **target != service_target)
            .map(|target| format!("{}={}", target, level)),
    );
    if let Some(extra) = &config.extra_directives {
        directives.push(extra.clone());
    }
    directives.join(",")
}

fn filter_directives(service_name: &str, config: &TelemetryConfig) -> String {
    match &config.filter_override {
        Some(filter) => filter.clone(),
        None => default_directives(service_name, config),
    }
}

fn build_filter(service_name: &str, config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    let directives = filter_directives(service_name, config);
    EnvFilter::try_new(&directives)
        .map_err(|e| TelemetryError::InvalidFilter(format!("{}: {}", directives, e)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(service_name: &str, config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(service_name, config)?;

    let (json_layer, plain_layer) = if config.json_logs {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_ids(config.with_thread_ids);
        (Some(layer), None)
    } else {
        let layer = tracing_subscriber::fmt::layer().with_thread_ids(config.with_thread_ids);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .try_init()
        .map_err(|e| TelemetryError::TracingInit(e.to_string()))?;

    tracing::info!(
        service = service_name,
        log_level = %config.log_level,
        filter_override = config.filter_override.is_some(),
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_and_workspace_crates_get_configured_level() {
        let config = TelemetryConfig {
            log_level: "debug".to_string(),
            ..TelemetryConfig::default()
        };
        let directives = default_directives("data-proxy", &config);

        assert!(directives.starts_with("warn,data_proxy=debug,"));
        assert!(directives.contains("geowatch_cache=debug"));
        assert!(!directives.contains("reqwest"));
    }

    #[test]
    fn test_workspace_service_is_not_listed_twice() {
        let directives = default_directives("geowatch-cache", &TelemetryConfig::default());
        assert_eq!(directives.matches("geowatch_cache=").count(), 1);
    }

    #[test]
    fn test_extra_directives_come_last() {
        let config = TelemetryConfig {
            extra_directives: Some("hyper=debug".to_string()),
            ..TelemetryConfig::default()
        };
        assert!(default_directives("data-proxy", &config).ends_with(",hyper=debug"));
    }

    #[test]
    fn test_override_replaces_generated_filter() {
        let config = TelemetryConfig {
            filter_override: Some("trace".to_string()),
            ..TelemetryConfig::default()
        };
        assert_eq!(filter_directives("data-proxy", &config), "trace");
        assert!(build_filter("data-proxy", &config).is_ok());
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = TelemetryConfig {
            log_level: "loudest".to_string(),
            ..TelemetryConfig::default()
        };
        let err = build_filter("data-proxy", &config).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter(_)));
    }
}
