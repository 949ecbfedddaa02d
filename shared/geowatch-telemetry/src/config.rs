//! Telemetry Configuration

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level for the workspace's own crates
    pub log_level: String,
    /// Full filter override (`RUST_LOG`), used verbatim when set
    pub filter_override: Option<String>,
    /// Extra directives appended to the generated filter
    pub extra_directives: Option<String>,
    pub json_logs: bool,
    pub with_thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            filter_override: None,
            extra_directives: None,
            json_logs: true,
            with_thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str, default: bool| {
            lookup(name)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(default)
        };
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            filter_override: non_empty("RUST_LOG"),
            extra_directives: non_empty("LOG_DIRECTIVES"),
            json_logs: flag("JSON_LOGS", true),
            with_thread_ids: flag("LOG_THREAD_IDS", false),
        }
    }
}
