//! Headline summaries from the Groq chat completions API

use geowatch_cache::{decode_object, CachePolicy, DecodeError, FetchError, Payload};
use geowatch_core::CacheKey;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::warn;

pub const ENDPOINT: &str = "/api/groq-summarize";
pub const MODEL: &str = "llama-3.1-8b-instant";
pub const MAX_HEADLINES: usize = 8;
pub const NOT_CONFIGURED: &str = "Groq API key not configured";

pub fn cache_policy() -> CachePolicy {
    let ttl = Duration::from_secs(24 * 60 * 60);
    CachePolicy::new(ENDPOINT, ttl).with_memory(256, ttl)
}

/// Body of `POST /api/groq-summarize`
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub headlines: Vec<String>,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "brief".to_string()
}

impl SummarizeRequest {
    pub fn headlines(&self) -> &[String] {
        &self.headlines[..self.headlines.len().min(MAX_HEADLINES)]
    }

    /// Same headlines in any order share a key
    pub fn cache_key(&self) -> CacheKey {
        let mut sorted: Vec<&str> = self.headlines().iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let digest = Sha256::digest(format!("{}:{}", self.mode, sorted.join("|")).as_bytes());
        let mut hash = String::with_capacity(16);
        for byte in &digest[..8] {
            let _ = write!(hash, "{:02x}", byte);
        }
        CacheKey::with_variant("summary", "v1", &hash)
    }

    fn prompts(&self) -> (&'static str, String) {
        let numbered = self
            .headlines()
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{}. {}", i + 1, h))
            .collect::<Vec<_>>()
            .join("\n");

        match self.mode.as_str() {
            "brief" => (
                "You are a concise news analyst. Summarize headlines in 2-3 varied sentences. Be factual. \
                 IMPORTANT: Start each summary differently - never start with \"The headlines\" or similar \
                 repetitive phrases. Vary your sentence structure.",
                format!(
                    "News headlines:\n{}\n\nWrite a 2-3 sentence summary. Start directly with the key development or theme:",
                    numbered
                ),
            ),
            "analysis" => (
                "You are a geopolitical analyst. Analyze news headlines to identify patterns, risks, and \
                 implications. Be concise but insightful.",
                format!(
                    "Analyze these news headlines for key patterns and implications:\n\n{}\n\nProvide a brief analysis (3-4 sentences):",
                    numbered
                ),
            ),
            _ => (
                "You are a news summarizer. Be concise and factual.",
                format!("Summarize: {}", numbered),
            ),
        }
    }
}

/// A generated summary as stored in both cache tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub summary: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub tokens: u64,
}

fn default_model() -> String {
    MODEL.to_string()
}

impl Payload for SummaryRecord {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        let object = decode_object(value)?;
        match object.get("summary") {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            Some(_) => {
                return Err(DecodeError::WrongType {
                    field: "summary",
                    expected: "a non-empty string",
                })
            }
            None => return Err(DecodeError::MissingField("summary")),
        }
        serde_json::from_value(value.clone()).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

/// Ask the model for a summary. Upstream statuses are preserved on the
/// error; an empty completion is a decode error.
pub async fn generate(
    http: &reqwest::Client,
    api_url: &str,
    api_key: &str,
    request: &SummarizeRequest,
) -> Result<SummaryRecord, FetchError> {
    let (system, user) = request.prompts();
    let body = json!({
        "model": MODEL,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": user },
        ],
        "temperature": 0.3,
        "max_tokens": 200,
        "top_p": 0.9,
    });

    let response = http
        .post(api_url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), detail = %detail, "Groq API error");
        let message = if status.as_u16() == 429 {
            "Rate limited"
        } else {
            "Groq API error"
        };
        return Err(FetchError::status(status.as_u16(), message));
    }

    let completion: Completion = response.json().await?;
    let summary = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(DecodeError::MissingField("choices[0].message.content"))?;

    Ok(SummaryRecord {
        summary,
        model: MODEL.to_string(),
        tokens: completion.usage.map(|u| u.total_tokens).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headlines: &[&str], mode: &str) -> SummarizeRequest {
        SummarizeRequest {
            headlines: headlines.iter().map(|h| h.to_string()).collect(),
            mode: mode.to_string(),
        }
    }

    #[test]
    fn test_cache_key_ignores_order_but_not_mode() {
        let a = request(&["Port closed", "Ceasefire holds"], "brief");
        let b = request(&["Ceasefire holds", "Port closed"], "brief");
        let c = request(&["Ceasefire holds", "Port closed"], "analysis");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert!(a.cache_key().as_str().starts_with("summary:v1:"));
    }

    #[test]
    fn test_only_first_eight_headlines_count() {
        let many: Vec<String> = (0..12).map(|i| format!("headline {}", i)).collect();
        let req = SummarizeRequest {
            headlines: many.clone(),
            mode: "brief".to_string(),
        };
        assert_eq!(req.headlines().len(), 8);

        let first_eight = SummarizeRequest {
            headlines: many[..8].to_vec(),
            mode: "brief".to_string(),
        };
        assert_eq!(req.cache_key(), first_eight.cache_key());
    }

    #[test]
    fn test_prompts_by_mode() {
        let (system, user) = request(&["A"], "analysis").prompts();
        assert!(system.starts_with("You are a geopolitical analyst"));
        assert!(user.contains("1. A"));

        let (system, user) = request(&["A"], "tweet").prompts();
        assert_eq!(system, "You are a news summarizer. Be concise and factual.");
        assert_eq!(user, "Summarize: 1. A");
    }

    #[test]
    fn test_record_decoder_rejects_empty_summary() {
        assert!(SummaryRecord::decode(&json!({"summary": "  "})).is_err());
        let record = SummaryRecord::decode(&json!({"summary": "Talks resumed."})).unwrap();
        assert_eq!(record.model, MODEL);
    }
}
