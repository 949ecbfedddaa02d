//! Per-key request coalescing
//!
//! Concurrent cache misses for the same key share one upstream fetch. The
//! lookup-or-register step runs under a synchronous lock with no `.await`
//! inside it, so two callers can never both see "nothing in flight" and both
//! start a fetch.
//!
//! The entry belongs to the fetch, not to the caller that started it. The
//! removal guard lives inside the shared future and the map only keeps a
//! weak handle, so the entry goes away when the fetch settles or when the
//! last caller waiting on it is dropped, whichever comes first.

use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::FetchError;

type FetchFuture<T> = BoxFuture<'static, Result<T, FetchError>>;
type InFlightMap<T> = Arc<Mutex<InFlight<T>>>;

struct InFlight<T> {
    entries: HashMap<String, InFlightEntry<T>>,
    next_id: u64,
}

struct InFlightEntry<T> {
    // Distinguishes a re-registered key from the fetch that owns the guard
    id: u64,
    fetch: WeakShared<FetchFuture<T>>,
}

pub struct Coalescer<T> {
    in_flight: InFlightMap<T>,
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(InFlight {
                entries: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Run `fetch` for `key`, or join the fetch already running for it.
    ///
    /// `fetch` is only invoked when this caller registers a new in-flight
    /// entry.
    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let shared = {
            let mut state = self.in_flight.lock();
            match state.entries.get(key).and_then(|e| e.fetch.upgrade()) {
                Some(existing) => {
                    tracing::debug!(key, "joining in-flight fetch");
                    existing
                }
                None => {
                    let id = state.next_id;
                    state.next_id += 1;

                    let guard = InFlightGuard {
                        in_flight: Arc::clone(&self.in_flight),
                        key: key.to_string(),
                        id,
                    };
                    let upstream = fetch();
                    let shared: Shared<FetchFuture<T>> = async move {
                        let _guard = guard;
                        upstream.await
                    }
                    .boxed()
                    .shared();

                    if let Some(weak) = shared.downgrade() {
                        state.entries.insert(key.to_string(), InFlightEntry { id, fetch: weak });
                    }
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of keys with a fetch currently registered
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().entries.len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().entries.contains_key(key)
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Dropped with the fetch future: on completion, or when every waiter is gone
struct InFlightGuard<T> {
    in_flight: InFlightMap<T>,
    key: String,
    id: u64,
}

impl<T> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        let mut state = self.in_flight.lock();
        if state.entries.get(&self.key).map(|e| e.id) == Some(self.id) {
            state.entries.remove(&self.key);
        }
    }
}
