//! Configuration for the data proxy

use std::net::SocketAddr;
use std::time::Duration;

/// Data proxy configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Upstash-compatible Redis REST endpoint for the shared cache tier
    pub upstash_url: Option<String>,
    pub upstash_token: Option<String>,
    /// Use a process-local durable tier when no REST endpoint is set
    pub local_durable_cache: bool,
    /// AIS relay (`ws://` / `wss://` accepted)
    pub ws_relay_url: Option<String>,
    pub groq_api_key: Option<String>,
    /// Extra browser origins, comma-separated in the environment
    pub allowed_origins: Vec<String>,
    pub ucdp_api_base: String,
    pub unhcr_api_base: String,
    pub open_meteo_api_base: String,
    pub groq_api_url: String,
    /// Per-request timeout for every upstream call
    pub upstream_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            upstash_url: non_empty_var("UPSTASH_REDIS_REST_URL"),
            upstash_token: non_empty_var("UPSTASH_REDIS_REST_TOKEN"),
            local_durable_cache: std::env::var("LOCAL_DURABLE_CACHE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            ws_relay_url: non_empty_var("WS_RELAY_URL"),
            groq_api_key: non_empty_var("GROQ_API_KEY"),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| parse_origin_list(&v))
                .unwrap_or_default(),
            ucdp_api_base: std::env::var("UCDP_API_BASE").unwrap_or(defaults.ucdp_api_base),
            unhcr_api_base: std::env::var("UNHCR_API_BASE").unwrap_or(defaults.unhcr_api_base),
            open_meteo_api_base: std::env::var("OPEN_METEO_API_BASE")
                .unwrap_or(defaults.open_meteo_api_base),
            groq_api_url: std::env::var("GROQ_API_URL").unwrap_or(defaults.groq_api_url),
            upstream_timeout_secs: parse_timeout_secs(
                std::env::var("UPSTREAM_TIMEOUT_SECS").ok().as_deref(),
                defaults.upstream_timeout_secs,
            )?,
        })
    }

    /// Get socket address for binding
    pub fn bind_address(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Never zero: a zero reqwest timeout fails every request immediately
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    /// HTTP base of the AIS relay: `ws(s)://` becomes `http(s)://`, no
    /// trailing slash.
    pub fn relay_base_url(&self) -> Option<String> {
        let raw = self.ws_relay_url.as_deref()?;
        let http = if let Some(rest) = raw.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if let Some(rest) = raw.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else {
            raw.to_string()
        };
        Some(http.trim_end_matches('/').to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upstash_url: None,
            upstash_token: None,
            local_durable_cache: false,
            ws_relay_url: None,
            groq_api_key: None,
            allowed_origins: Vec::new(),
            ucdp_api_base: "https://ucdpapi.pcr.uu.se".to_string(),
            unhcr_api_base: "https://api.unhcr.org".to_string(),
            open_meteo_api_base: "https://archive-api.open-meteo.com".to_string(),
            groq_api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            upstream_timeout_secs: 30,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_timeout_secs(raw: Option<&str>, default: u64) -> anyhow::Result<u64> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    let secs: u64 = raw
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid UPSTREAM_TIMEOUT_SECS {:?}: {}", raw, e))?;
    if secs == 0 {
        anyhow::bail!("UPSTREAM_TIMEOUT_SECS must be at least 1");
    }
    Ok(secs)
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
