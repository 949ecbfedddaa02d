//! Upstream data sources
//!
//! Each source owns its cache key, cache policy, payload type (with its
//! decoder) and the fetch that produces a fresh payload.

pub mod ais;
pub mod climate;
pub mod summarize;
pub mod ucdp;
pub mod unhcr;
pub mod worldpop;

use geowatch_cache::FetchError;
use serde_json::Value;

/// GET a JSON document, treating any non-2xx status as a failure
pub(crate) async fn get_json(
    http: &reqwest::Client,
    url: &str,
    label: &str,
) -> Result<Value, FetchError> {
    let response = http
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::status(
            status.as_u16(),
            format!("{} HTTP {}", label, status.as_u16()),
        ));
    }

    Ok(response.json::<Value>().await?)
}

/// Current UTC time as the `cached_at` stamp
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
