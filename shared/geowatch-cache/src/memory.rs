//! Bounded in-process cache tier
//!
//! Holds already-decoded payloads for latency and to ride out durable-tier
//! outages. Capacity is a hard bound: inserting past it evicts the entries
//! with the oldest `last_access` (LRU, not insertion order). Entries older
//! than `max_age` are purged when read, fresh or stale.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// In-process tier limits
#[derive(Debug, Clone, Copy)]
pub struct MemoryTierConfig {
    pub max_entries: usize,
    /// Hard age limit, also bounding stale reads
    pub max_age: Duration,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            max_entries: 8,
            max_age: Duration::from_secs(60),
        }
    }
}

struct MemoryEntry<T> {
    value: T,
    stored_at: Instant,
    last_access: Instant,
    // Tie-breaker for entries touched within the same clock tick
    access_seq: u64,
}

struct Entries<T> {
    map: HashMap<String, MemoryEntry<T>>,
    next_seq: u64,
}

pub struct MemoryTier<T> {
    entries: Mutex<Entries<T>>,
    config: MemoryTierConfig,
}

impl<T: Clone> MemoryTier<T> {
    pub fn new(config: MemoryTierConfig) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                next_seq: 0,
            }),
            config: MemoryTierConfig {
                max_entries: config.max_entries.max(1),
                max_age: config.max_age,
            },
        }
    }

    /// Value stored no longer than `ttl` ago.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<T> {
        self.lookup(key, Some(ttl))
    }

    /// Value of any age up to `max_age`, ignoring TTL.
    pub fn get_stale(&self, key: &str) -> Option<T> {
        self.lookup(key, None)
    }

    fn lookup(&self, key: &str, ttl: Option<Duration>) -> Option<T> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let seq = entries.next_seq;

        let age = now.saturating_duration_since(entries.map.get(key)?.stored_at);
        if age > self.config.max_age {
            entries.map.remove(key);
            return None;
        }
        if matches!(ttl, Some(ttl) if age > ttl) {
            return None;
        }

        entries.next_seq += 1;
        let entry = entries.map.get_mut(key)?;
        entry.last_access = now;
        entry.access_seq = seq;
        Some(entry.value.clone())
    }

    /// Store or overwrite `key`, then trim to capacity.
    pub fn insert(&self, key: &str, value: T) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.map.insert(
            key.to_string(),
            MemoryEntry {
                value,
                stored_at: now,
                last_access: now,
                access_seq: seq,
            },
        );

        let overflow = entries.map.len().saturating_sub(self.config.max_entries);
        if overflow == 0 {
            return;
        }

        let mut by_age: Vec<(Instant, u64, String)> = entries
            .map
            .iter()
            .map(|(k, e)| (e.last_access, e.access_seq, k.clone()))
            .collect();
        by_age.sort();
        for (_, _, evicted) in by_age.into_iter().take(overflow) {
            tracing::debug!(key = %evicted, "evicting in-process cache entry");
            entries.map.remove(&evicted);
        }
    }

    pub fn remove(&self, key: &str) {
        self.entries.lock().map.remove(key);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> MemoryTierConfig {
        self.config
    }
}
