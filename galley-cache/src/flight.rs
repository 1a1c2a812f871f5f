//! Single-flight coalescing of concurrent identical requests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// A flight plus the generation that started it.
type Calls<T> = Arc<Mutex<HashMap<String, (u64, Flight<T>)>>>;

/// Map from fingerprint to the upstream call currently in progress for it.
///
/// The first caller for a key starts the work; callers arriving before it
/// finishes await the same shared future instead of starting their own.
/// Each flight is driven on its own task and removes its key when it
/// completes, whether or not anyone is still waiting, so a later call with
/// the same key starts fresh.
pub struct SingleFlight<T: Clone + Send + Sync + 'static> {
    calls: Calls<T>,
    generation: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Runs `work` for `key`, or joins the call already in flight for it.
    ///
    /// `work` is only invoked when no call is in flight. Must be called from
    /// within a tokio runtime.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut calls = self.calls.lock();
            match calls.get(key) {
                Some((_, existing)) => {
                    debug!(key, "Joining in-flight request");
                    existing.clone()
                }
                None => {
                    let id = self.generation.fetch_add(1, Ordering::Relaxed);
                    let flight = Self::start(Arc::clone(&self.calls), key.to_string(), id, work());
                    calls.insert(key.to_string(), (id, flight.clone()));
                    // Completes and cleans up even if every waiter is dropped.
                    tokio::spawn(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    fn start<Fut>(calls: Calls<T>, key: String, id: u64, work: Fut) -> Flight<T>
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        async move {
            let output = work.await;
            let mut calls = calls.lock();
            if calls.get(&key).is_some_and(|(current, _)| *current == id) {
                calls.remove(&key);
            }
            output
        }
        .boxed()
        .shared()
    }

    /// Number of keys with a call in progress.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
