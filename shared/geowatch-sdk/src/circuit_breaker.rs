//! Circuit Breaker for dashboard data feeds
//!
//! Keeps a failing feed from being hammered by every refresh:
//! - Opens after `max_failures` consecutive failures
//! - Serves the caller's fallback while open, without calling the feed
//! - After `cooldown`, lets exactly one trial call through

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation - calls flow through
    Closed,
    /// Cooling down - fallback served without calling
    Open,
    /// One trial call decides between Closed and Open
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub max_failures: u32,
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 2,
            cooldown: Duration::from_secs(5 * 60),
        }
    }
}

/// Point-in-time view for status displays
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Normal,
    Trial,
}

pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: &str, config: BreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Run `f` unless the breaker is open; any error or refusal yields
    /// `fallback`. Never fails.
    pub async fn execute<T, E, F, Fut>(&self, f: F, fallback: T) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let Some(permit) = self.acquire() else {
            tracing::debug!(breaker = %self.name, "circuit open, serving fallback");
            return fallback;
        };

        let mut trial = TrialGuard {
            inner: &self.inner,
            armed: permit == Permit::Trial,
        };

        let result = f().await;
        trial.armed = false;

        match result {
            Ok(value) => {
                self.on_success(permit);
                value
            }
            Err(e) => {
                tracing::warn!(breaker = %self.name, error = %e, "call failed");
                self.on_failure(permit);
                fallback
            }
        }
    }

    fn acquire(&self) -> Option<Permit> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Some(Permit::Normal),
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .map(|opened| opened.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if !cooled {
                    return None;
                }
                inner.state = CircuitState::HalfOpen;
                inner.trial_in_flight = true;
                tracing::info!(breaker = %self.name, "circuit half-open, trying one call");
                Some(Permit::Trial)
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return None;
                }
                inner.trial_in_flight = true;
                Some(Permit::Trial)
            }
        }
    }

    fn on_success(&self, permit: Permit) {
        let mut inner = self.inner.lock();
        match permit {
            Permit::Trial => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.trial_in_flight = false;
                tracing::info!(breaker = %self.name, "circuit closed after recovery");
            }
            Permit::Normal => {
                if inner.state == CircuitState::Closed {
                    inner.consecutive_failures = 0;
                }
            }
        }
    }

    fn on_failure(&self, permit: Permit) {
        let mut inner = self.inner.lock();
        match permit {
            Permit::Trial => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
                tracing::warn!(breaker = %self.name, "circuit re-opened after failed trial");
            }
            Permit::Normal => {
                inner.consecutive_failures += 1;
                let failures = inner.consecutive_failures;
                if inner.state == CircuitState::Closed && failures >= self.config.max_failures {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(breaker = %self.name, failures, "circuit opened");
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    pub fn status(&self) -> BreakerStatus {
        let inner = self.inner.lock();
        BreakerStatus {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }
}

/// Frees the half-open trial slot if the trial call is dropped mid-flight.
struct TrialGuard<'a> {
    inner: &'a Mutex<BreakerInner>,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock().trial_in_flight = false;
        }
    }
}

/// Named breakers, one per data feed
#[derive(Default)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: BreakerConfig,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.config)))
            .clone()
    }

    pub fn statuses(&self) -> Vec<BreakerStatus> {
        let mut statuses: Vec<BreakerStatus> =
            self.breakers.iter().map(|b| b.value().status()).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Open and half-open breakers, for the dashboard status bar
    pub fn unhealthy(&self) -> Vec<BreakerStatus> {
        self.statuses()
            .into_iter()
            .filter(|s| s.state != CircuitState::Closed)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker(max_failures: u32, cooldown_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "UCDP Events",
            BreakerConfig {
                max_failures,
                cooldown: Duration::from_secs(cooldown_secs),
            },
        )
    }

    async fn fail(cb: &CircuitBreaker) -> u32 {
        cb.execute(|| async { Err::<u32, _>("HTTP 500") }, 0).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_max_failures() {
        let cb = breaker(3, 60);

        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);

        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_never_calls_and_returns_fallback() {
        let cb = breaker(1, 60);
        fail(&cb).await;

        let calls = AtomicUsize::new(0);
        let value = cb
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                },
                99,
            )
            .await;
        assert_eq!(value, 99);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_after_cooldown_closes_on_success() {
        let cb = breaker(1, 60);
        fail(&cb).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        let value = cb.execute(|| async { Ok::<_, String>(5) }, 0).await;
        assert_eq!(value, 5);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens_with_fresh_cooldown() {
        let cb = breaker(1, 60);
        fail(&cb).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        let calls = AtomicUsize::new(0);
        cb.execute(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(1)
            },
            0,
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_while_half_open() {
        let cb = Arc::new(breaker(1, 60));
        fail(&cb).await;
        tokio::time::advance(Duration::from_secs(61)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let slow = {
            let cb = cb.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cb.execute(
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        Ok::<_, String>(1)
                    },
                    0,
                )
                .await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let second = cb.execute(|| async { Ok::<_, String>(2) }, -1).await;
        assert_eq!(second, -1);

        assert_eq!(slow.await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_frees_the_slot() {
        let cb = breaker(1, 60);
        fail(&cb).await;
        tokio::time::advance(Duration::from_secs(61)).await;

        let pending = cb.execute(
            || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, String>(1)
            },
            0,
        );
        let _ = tokio::time::timeout(Duration::from_secs(1), pending).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let value = cb.execute(|| async { Ok::<_, String>(3) }, 0).await;
        assert_eq!(value, 3);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_reports_unhealthy() {
        let registry = BreakerRegistry::new(BreakerConfig::default());
        let ucdp = registry.get_or_create("UCDP Events");
        let _climate = registry.get_or_create("Climate Anomalies");
        assert!(Arc::ptr_eq(&ucdp, &registry.get_or_create("UCDP Events")));

        fail(&ucdp).await;
        fail(&ucdp).await;

        let unhealthy = registry.unhealthy();
        assert_eq!(unhealthy.len(), 1);
        assert_eq!(unhealthy[0].name, "UCDP Events");
        assert_eq!(unhealthy[0].state, CircuitState::Open);
        assert_eq!(registry.statuses().len(), 2);
    }
}
