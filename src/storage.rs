use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Leaderboard pages are considered fresh for five minutes.
pub const LEADERBOARD_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        CacheEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |expires_at| now >= expires_at)
    }
}

type Flight = Arc<tokio::sync::Mutex<()>>;

/// In-memory keyed store with optional passive time expiry and per-key
/// single-flight computation.
pub struct CacheStore<V> {
    name: &'static str,
    ttl: Option<Duration>,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    // One lock per key currently being computed
    flights: Mutex<HashMap<String, Flight>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(name: &'static str, ttl: Option<Duration>) -> CacheStore<V> {
        CacheStore {
            name,
            ttl,
            entries: Mutex::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Store for leaderboard pages, expiring after `ttl`.
    pub fn with_ttl(name: &'static str, ttl: Duration) -> CacheStore<V> {
        CacheStore::new(name, Some(ttl))
    }

    /// Store whose entries never expire by age.
    pub fn unbounded(name: &'static str) -> CacheStore<V> {
        CacheStore::new(name, None)
    }

    /// Cached value for `key`, if present and not expired. Expired entries are
    /// dropped on read.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                debug!(cache = self.name, key, "entry expired");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: &str, value: V) {
        let entry = CacheEntry::new(value, self.ttl);
        self.entries.lock().unwrap().insert(key.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key`, or run `compute`, store its result
    /// and return it.
    pub async fn fetch_cached<F, Fut, E>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.fetch_cached_where(key, |_| true, compute).await
    }

    /// Like [`CacheStore::fetch_cached`], but a cached value rejected by
    /// `accept` counts as a miss and is overwritten by the computed one.
    ///
    /// Concurrent callers missing on the same key wait for the first one and
    /// reuse what it stored. Errors are returned as-is and never cached.
    pub async fn fetch_cached_where<A, F, Fut, E>(
        &self,
        key: &str,
        accept: A,
        compute: F,
    ) -> Result<V, E>
    where
        A: Fn(&V) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).filter(|value| accept(value)) {
            debug!(cache = self.name, key, "cache hit");
            return Ok(value);
        }

        let flight = self.join_flight(key);
        let result = {
            let _guard = flight.lock().await;
            // Whoever held the flight before us may have just stored a usable value.
            match self.get(key).filter(|value| accept(value)) {
                Some(value) => {
                    debug!(cache = self.name, key, "cache hit after waiting on in-flight fetch");
                    Ok(value)
                }
                None => {
                    debug!(cache = self.name, key, "cache miss");
                    match compute().await {
                        Ok(value) => {
                            self.insert(key, value.clone());
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    }
                }
            }
        };
        self.leave_flight(key, flight);

        result
    }

    fn join_flight(&self, key: &str) -> Flight {
        self.flights
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn leave_flight(&self, key: &str, flight: Flight) {
        let mut flights = self.flights.lock().unwrap();
        // The map holds one reference and we hold the other: nobody is waiting.
        let idle = Arc::strong_count(&flight) == 2;
        drop(flight);
        if idle {
            flights.remove(key);
        }
    }
}
