//! AIS vessel snapshot from the websocket relay's HTTP side

use geowatch_cache::{decode_object, require_array, require_object, CachePolicy, DecodeError, FetchError, Payload};
use geowatch_core::{CacheKey, CacheStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::get_json;

pub const ENDPOINT: &str = "/api/ais-snapshot";
pub const TTL_SECS: u64 = 8;
pub const NOT_CONFIGURED: &str = "AIS relay not configured";

pub fn cache_key(include_candidates: bool) -> CacheKey {
    let variant = if include_candidates { "full" } else { "lite" };
    CacheKey::with_variant("ais-snapshot", "v1", variant)
}

pub fn cache_policy() -> CachePolicy {
    CachePolicy::new(ENDPOINT, Duration::from_secs(TTL_SECS))
        .with_memory(8, Duration::from_secs(60))
        .with_fallback_status(CacheStatus::MemoryErrorFallback)
}

/// The relay's snapshot, passed through as-is once its shape is checked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AisSnapshot(pub Value);

impl Payload for AisSnapshot {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        let object = decode_object(value)?;
        require_object(object, "status")?;
        require_array(object, "disruptions")?;
        require_array(object, "density")?;
        Ok(Self(value.clone()))
    }
}

pub async fn fetch_snapshot(
    http: &reqwest::Client,
    relay_base: Option<&str>,
    include_candidates: bool,
) -> Result<AisSnapshot, FetchError> {
    let Some(base) = relay_base else {
        return Err(FetchError::NotConfigured(NOT_CONFIGURED.to_string()));
    };
    let url = format!("{}/ais/snapshot?candidates={}", base, include_candidates);
    let body = get_json(http, &url, "AIS relay").await?;
    Ok(AisSnapshot::decode(&body)?)
}
