//! Durable cache tier
//!
//! The tier of record, shared by every proxy instance. Stores JSON values
//! under versioned keys and enforces TTL itself (expired keys read as
//! absent).

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::{CacheError, Result};

#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get_json(&self, key: &str) -> Result<Option<Value>>;

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;

    /// Short backend label for logs and readiness output
    fn backend(&self) -> &'static str;

    /// False for the null store; readiness reports it as not configured
    fn is_shared(&self) -> bool {
        true
    }
}

/// Upstash-compatible Redis over its REST command endpoint.
///
/// Commands are posted as JSON arrays (`["GET", key]`) with a bearer token;
/// replies are `{"result": ...}` or `{"error": "..."}`.
pub struct UpstashStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UpstashReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(client: reqwest::Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn command(&self, args: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CacheError::Status(response.status().as_u16()));
        }

        let reply: UpstashReply = response.json().await?;
        if let Some(error) = reply.error {
            return Err(CacheError::Protocol(error));
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl DurableStore for UpstashStore {
    async fn get_json(&self, key: &str) -> Result<Option<Value>> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            other => Ok(Some(other)),
        }
    }

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        let ttl_secs = ttl.as_secs().max(1);
        self.command(json!(["SET", key, encoded, "EX", ttl_secs]))
            .await
            .map(|_| ())
    }

    fn backend(&self) -> &'static str {
        "upstash"
    }
}

const DEFAULT_SWEEP_THRESHOLD: usize = 1024;

/// Process-local stand-in for the shared tier, with the same TTL semantics.
///
/// Keys that are written but never read again are reclaimed by a sweep of
/// expired entries, run from `set_json` once the map reaches the sweep
/// threshold.
pub struct LocalStore {
    entries: DashMap<String, (Value, Instant)>,
    sweep_threshold: usize,
    next_sweep: AtomicUsize,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::with_sweep_threshold(DEFAULT_SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            entries: DashMap::new(),
            sweep_threshold: threshold,
            next_sweep: AtomicUsize::new(threshold),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep_expired(&self) {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);

        // live keys above the threshold push the next sweep out
        let remaining = self.entries.len();
        self.next_sweep
            .store(self.sweep_threshold.max(remaining * 2), Ordering::Relaxed);
        tracing::debug!(swept = before - remaining, remaining, "local durable tier swept");
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableStore for LocalStore {
    async fn get_json(&self, key: &str) -> Result<Option<Value>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.1 > now {
                return Ok(Some(entry.0.clone()));
            }
        }
        self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        Ok(None)
    }

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        if self.entries.len() >= self.next_sweep.load(Ordering::Relaxed) {
            self.sweep_expired();
        }
        self.entries
            .insert(key.to_string(), (value.clone(), Instant::now() + ttl));
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

/// No durable tier configured: every read misses, writes are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl DurableStore for NullStore {
    async fn get_json(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn set_json(&self, _key: &str, _value: &Value, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "none"
    }

    fn is_shared(&self) -> bool {
        false
    }
}
