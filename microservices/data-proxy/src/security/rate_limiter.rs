//! Rate Limiter
//!
//! Fixed-window request counting per client key, with a bounded key table.
//! When the table is full the least recently seen key is evicted, which
//! lets that client start a fresh window.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub limit: u64,
    pub window: Duration,
    /// Tracked keys before LRU eviction kicks in
    pub max_entries: usize,
}

impl RateLimitConfig {
    pub fn per_minute(limit: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(60),
            max_entries: 5000,
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

struct RateBucket {
    count: u64,
    window_start: Instant,
    last_seen: u64,
}

#[derive(Default)]
struct LimiterState {
    buckets: HashMap<String, RateBucket>,
    /// Access sequence -> key, oldest first
    by_access: BTreeMap<u64, String>,
    next_seq: u64,
}

impl LimiterState {
    fn evict_to(&mut self, max_entries: usize) -> usize {
        let mut evicted = 0;
        while self.buckets.len() >= max_entries.max(1) {
            let Some((_, key)) = self.by_access.pop_first() else {
                break;
            };
            self.buckets.remove(&key);
            evicted += 1;
        }
        evicted
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Check if request is allowed
    pub fn check(&self, key: &str) -> bool {
        matches!(self.evaluate(key), RateLimitResult::Allowed { .. })
    }

    /// Count a request against `key` and report the remaining budget
    pub fn evaluate(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let window = self.config.window;
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let seq = state.next_seq;
        state.next_seq += 1;

        if !state.buckets.contains_key(key) {
            let evicted = state.evict_to(self.config.max_entries);
            if evicted > 0 {
                tracing::warn!(
                    evicted,
                    max_entries = self.config.max_entries,
                    "rate limiter table full, evicted least recently seen clients"
                );
            }
        }

        let bucket = state.buckets.entry(key.to_string()).or_insert(RateBucket {
            count: 0,
            window_start: now,
            last_seen: seq,
        });

        let previous_seq = bucket.last_seen;
        bucket.last_seen = seq;

        // Reset window if expired
        if now.duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        bucket.count += 1;

        let result = if bucket.count > self.config.limit {
            let elapsed = now.duration_since(bucket.window_start);
            RateLimitResult::Exceeded {
                retry_after: window.saturating_sub(elapsed).as_secs().max(1),
            }
        } else {
            RateLimitResult::Allowed {
                remaining: self.config.limit - bucket.count,
            }
        };

        state.by_access.remove(&previous_seq);
        state.by_access.insert(seq, key.to_string());

        result
    }

    /// Keys currently tracked
    pub fn len(&self) -> usize {
        self.state.lock().buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_tracking(&self, key: &str) -> bool {
        self.state.lock().buckets.contains_key(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed { remaining: u64 },
    Exceeded { retry_after: u64 },
}
