//! Cache domain types shared by the proxy endpoints and their clients

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a response body came from. Sent to browsers as the `X-Cache` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheStatus {
    /// Served from the durable (shared) tier
    #[serde(rename = "REDIS-HIT")]
    RedisHit,
    /// Served from this instance's in-process tier within TTL
    #[serde(rename = "MEMORY-HIT")]
    MemoryHit,
    /// Fetched from upstream on this request
    #[serde(rename = "MISS")]
    Miss,
    /// Upstream failed; an expired in-process copy was served
    #[serde(rename = "STALE")]
    Stale,
    /// Upstream failed; a recent in-process snapshot was served
    #[serde(rename = "MEMORY-ERROR-FALLBACK")]
    MemoryErrorFallback,
    /// Upstream connection settings are missing
    #[serde(rename = "NO-RELAY-CONFIG")]
    NoRelayConfig,
    /// Nothing fresh or stale could be served
    #[serde(rename = "ERROR")]
    Error,
}

impl CacheStatus {
    pub const ALL: [CacheStatus; 7] = [
        CacheStatus::RedisHit,
        CacheStatus::MemoryHit,
        CacheStatus::Miss,
        CacheStatus::Stale,
        CacheStatus::MemoryErrorFallback,
        CacheStatus::NoRelayConfig,
        CacheStatus::Error,
    ];

    pub fn as_header(&self) -> &'static str {
        match self {
            Self::RedisHit => "REDIS-HIT",
            Self::MemoryHit => "MEMORY-HIT",
            Self::Miss => "MISS",
            Self::Stale => "STALE",
            Self::MemoryErrorFallback => "MEMORY-ERROR-FALLBACK",
            Self::NoRelayConfig => "NO-RELAY-CONFIG",
            Self::Error => "ERROR",
        }
    }

    /// True when the body is real data rather than an error payload.
    pub fn is_served(&self) -> bool {
        !matches!(self, Self::NoRelayConfig | Self::Error)
    }

    /// True for the two stale-on-error markers.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Stale | Self::MemoryErrorFallback)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_header())
    }
}

/// Versioned cache key: `namespace:version[:variant]`.
///
/// The version tag is a required constructor argument so a change in response
/// shape is made by bumping it rather than silently reusing old entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(namespace: &str, version: &str) -> Self {
        Self(format!("{}:{}", namespace, version))
    }

    /// Key for one request shape of a namespace (e.g. `full` vs `lite`).
    pub fn with_variant(namespace: &str, version: &str, variant: &str) -> Self {
        Self(format!("{}:{}:{}", namespace, version, variant))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_layout() {
        assert_eq!(CacheKey::new("ucdp:gedevents", "v2").as_str(), "ucdp:gedevents:v2");
        assert_eq!(
            CacheKey::with_variant("ais-snapshot", "v1", "full").to_string(),
            "ais-snapshot:v1:full"
        );
    }

    #[test]
    fn test_status_header_matches_serde_name() {
        for status in CacheStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_header()));
        }
    }

    #[test]
    fn test_fallback_markers() {
        assert!(CacheStatus::Stale.is_fallback());
        assert!(CacheStatus::MemoryErrorFallback.is_fallback());
        assert!(!CacheStatus::Miss.is_fallback());
        assert!(!CacheStatus::Error.is_served());
    }
}
