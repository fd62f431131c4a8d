//! Request-coalescing cache manager
//!
//! Wraps a `CacheStore` and guarantees at most one in-flight producer per key.
//! Concurrent callers that miss on the same key await one shared outcome
//! instead of each hitting the upstream.

use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::CacheStore;

/// Errors surfaced by `CacheManager::get_or_set`
///
/// Cloneable because one outcome is handed to every waiter on the key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The producer returned an error; nothing was cached
    #[error("Producer for key '{key}' failed: {message}")]
    ProducerFailed { key: String, message: String },

    /// The producer task panicked or was aborted; nothing was cached
    #[error("Producer for key '{key}' panicked")]
    ProducerPanicked { key: String },
}

type SharedOutcome<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;
type PendingMap<V> = HashMap<String, SharedOutcome<V>>;

/// Clears a key's pending slot when the producer task ends, including by panic
struct PendingGuard<V> {
    pending: Arc<Mutex<PendingMap<V>>>,
    key: String,
}

impl<V> Drop for PendingGuard<V> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.key);
    }
}

/// TTL cache with single-flight population
///
/// Cloning yields another handle onto the same store and pending set, so one
/// instance can be built at startup and handed to every request handler.
pub struct CacheManager<V> {
    store: CacheStore<V>,
    pending: Arc<Mutex<PendingMap<V>>>,
    default_ttl: Duration,
}

impl<V> Clone for CacheManager<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            pending: Arc::clone(&self.pending),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V> fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("entries", &self.store.len())
            .field("pending", &self.pending.lock().len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache whose `get_or_set` uses `default_ttl`
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            store: CacheStore::new(),
            pending: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &CacheStore<V> {
        &self.store
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Reads a fresh value, if any
    pub fn get(&self, key: &str) -> Option<V> {
        self.store.get(key)
    }

    /// Stores a value directly, bypassing coalescing
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        self.store.set(key, value, ttl);
    }

    /// Number of producers currently running
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns the cached value for `key`, or runs `producer` once to fill it
    ///
    /// Uses the manager's default TTL. See `get_or_set_with_ttl`.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, producer: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.get_or_set_with_ttl(key, self.default_ttl, producer)
            .await
    }

    /// Returns the cached value for `key`, or runs `producer` once to fill it
    ///
    /// # Behavior
    /// - A fresh entry is returned without invoking `producer`
    /// - If another caller is already producing `key`, this call awaits that
    ///   outcome and `producer` is dropped unused (or, when two misses race,
    ///   the future it returned is dropped unpolled)
    /// - Otherwise `producer` is spawned onto the runtime; on success the
    ///   value is stored with `ttl`, on failure nothing is stored and every
    ///   waiter receives the same `CacheError`
    ///
    /// The producer runs to completion even if every caller stops waiting, so
    /// the pending slot is always released.
    pub async fn get_or_set_with_ttl<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        if let Some(value) = self.store.get(key) {
            debug!("cache hit for '{}'", key);
            return Ok(value);
        }

        let in_flight = self.pending.lock().get(key).cloned();
        if let Some(in_flight) = in_flight {
            debug!("joining in-flight producer for '{}'", key);
            return in_flight.await;
        }

        // Called without the pending lock held: the producer may use this cache
        let fut = producer();

        let outcome = {
            let mut pending = self.pending.lock();
            if let Some(in_flight) = pending.get(key) {
                debug!("lost the race for '{}', joining in-flight producer", key);
                in_flight.clone()
            } else if let Some(value) = self.store.get(key) {
                // Filled between the first read and taking the lock
                return Ok(value);
            } else {
                debug!("cache miss for '{}', starting producer", key);
                // Inserted under the same lock the producer task needs to clear it
                let outcome = self.spawn_producer(key, ttl, fut).shared();
                pending.insert(key.to_string(), outcome.clone());
                outcome
            }
        };

        outcome.await
    }

    fn spawn_producer<Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        fut: Fut,
    ) -> BoxFuture<'static, Result<V, CacheError>>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let store = self.store.clone();
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            key: key.to_string(),
        };

        let handle = tokio::spawn(async move {
            let result = fut.await;
            match result {
                Ok(value) => {
                    store.set(&guard.key, value.clone(), ttl);
                    drop(guard);
                    Ok(value)
                }
                Err(e) => {
                    debug!("producer for '{}' failed: {}", guard.key, e);
                    Err(CacheError::ProducerFailed {
                        key: guard.key.clone(),
                        message: e.to_string(),
                    })
                }
            }
        });

        let key = key.to_string();
        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(_) => Err(CacheError::ProducerPanicked { key }),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn counting_producer(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, String>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_producer() {
        let cache = CacheManager::new(Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_set("x", counting_producer(&calls, Duration::from_millis(200), 1)),
            cache.get_or_set("x", counting_producer(&calls, Duration::from_millis(200), 2)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1, "Producer should run once");
        assert_eq!(a, b);
        assert!(a.is_ok());
        assert_eq!(cache.pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_tasks_share_one_producer() {
        let cache = CacheManager::new(Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                let producer = counting_producer(&calls, Duration::from_millis(100), i);
                tokio::spawn(async move { cache.get_or_set("herd", producer).await })
            })
            .collect();

        let results: Vec<u32> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.expect("task should not panic").expect("producer should succeed"))
            .collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| w[0] == w[1]), "All callers see one value");
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_producer() {
        let cache = CacheManager::new(Duration::from_secs(5));
        cache.set("k", 10, Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));

        let value = cache
            .get_or_set("k", counting_producer(&calls, Duration::ZERO, 99))
            .await
            .unwrap();

        assert_eq!(value, 10);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_result_is_cached_with_ttl() {
        let cache = CacheManager::new(Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_set_with_ttl("k", Duration::from_millis(50), counting_producer(&calls, Duration::ZERO, 1))
            .await
            .unwrap();
        assert_eq!(cache.get("k"), Some(1));

        tokio::time::sleep(Duration::from_millis(80)).await;

        let second = cache
            .get_or_set_with_ttl("k", Duration::from_millis(50), counting_producer(&calls, Duration::ZERO, 2))
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2, "Expired entry should be produced again");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache: CacheManager<u32> = CacheManager::new(Duration::from_secs(5));

        let failed = cache
            .get_or_set("k", || async { Err::<u32, _>("upstream down".to_string()) })
            .await;

        match failed {
            Err(CacheError::ProducerFailed { key, message }) => {
                assert_eq!(key, "k");
                assert_eq!(message, "upstream down");
            }
            other => panic!("Expected ProducerFailed, got {:?}", other),
        }
        assert!(cache.get("k").is_none());
        assert_eq!(cache.pending_count(), 0);

        let recovered = cache
            .get_or_set("k", || async { Ok::<u32, String>(42) })
            .await;
        assert_eq!(recovered, Ok(42));
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter() {
        let cache: CacheManager<u32> = CacheManager::new(Duration::from_secs(5));
        let failing = || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<u32, String>("boom".to_string())
        };

        let (a, b) = tokio::join!(cache.get_or_set("k", failing), cache.get_or_set("k", failing));

        assert!(a.is_err());
        assert_eq!(a, b);
        assert_eq!(cache.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_producer_releases_key() {
        let cache: CacheManager<u32> = CacheManager::new(Duration::from_secs(5));

        let result = cache
            .get_or_set("k", || async {
                if true {
                    panic!("producer exploded");
                }
                Ok::<u32, String>(0)
            })
            .await;

        assert_eq!(
            result,
            Err(CacheError::ProducerPanicked {
                key: "k".to_string()
            })
        );
        assert_eq!(cache.pending_count(), 0);

        let recovered = cache.get_or_set("k", || async { Ok::<u32, String>(5) }).await;
        assert_eq!(recovered, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_keys_run_in_parallel() {
        let cache = CacheManager::new(Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let (a, b) = tokio::join!(
            cache.get_or_set("a", counting_producer(&calls, Duration::from_millis(200), 1)),
            cache.get_or_set("b", counting_producer(&calls, Duration::from_millis(200), 2)),
        );

        assert_eq!(a, Ok(1));
        assert_eq!(b, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(
            started.elapsed() < Duration::from_millis(400),
            "Misses on different keys should not serialize"
        );
    }

    #[tokio::test]
    async fn test_producer_may_read_the_same_cache() {
        let cache: CacheManager<u32> = CacheManager::new(Duration::from_secs(5));
        cache.set("base", 40, Duration::from_secs(5));
        let inner = cache.clone();

        let value = cache
            .get_or_set("derived", move || {
                let running = inner.pending_count();
                let base = inner.get("base").unwrap_or(0);
                async move { Ok::<u32, String>(base + running as u32 + 2) }
            })
            .await;

        assert_eq!(value, Ok(42));
        assert_eq!(cache.get("derived"), Some(42));
        assert_eq!(cache.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_caller_still_fills_cache() {
        let cache = CacheManager::new(Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            cache.get_or_set("k", counting_producer(&calls, Duration::from_millis(100), 3)),
        )
        .await;
        assert!(abandoned.is_err(), "Caller should give up before the producer ends");

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("k"), Some(3));
        assert_eq!(cache.pending_count(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
