//! # TTL Cache with Single-Flight
//!
//! A keyed cache for expensive contract-backed computations. Values carry
//! a positive/negative marker that selects which of two TTLs applies:
//! positive results live for the long TTL, negative ones are rechecked
//! after the short TTL.
//!
//! Concurrent misses for the same key are collapsed into one computation:
//! the first caller becomes the leader and runs it, every other caller
//! subscribes to the leader's broadcast slot and receives a clone of the
//! outcome. Errors are fanned out to all waiters but never stored.
//!
//! [`TtlCache::bust`] removes a stored entry immediately. Computations
//! already in flight are unaffected; the next caller after they complete
//! re-enters single-flight as usual.

use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::CacheTtl;
use crate::domain::{AuthError, Decision, EntitlementData, MembershipStatus, WalletSet};

/// Marker telling the cache which TTL bucket a value belongs to.
pub trait Cacheable {
    /// True for values that may be served for the long TTL. False for
    /// values that should be rechecked after the short negative TTL.
    fn is_positive(&self) -> bool;
}

impl Cacheable for Decision {
    fn is_positive(&self) -> bool {
        self.allowed
    }
}

impl Cacheable for WalletSet {
    fn is_positive(&self) -> bool {
        true
    }
}

impl Cacheable for MembershipStatus {
    fn is_positive(&self) -> bool {
        true
    }
}

impl Cacheable for EntitlementData {
    fn is_positive(&self) -> bool {
        self.cacheable
    }
}

/// A stored value plus the bookkeeping needed to expire it.
#[derive(Clone, Debug)]
struct CachedValue<V> {
    value: V,
    inserted_at: Instant,
    positive: bool,
}

impl<V> CachedValue<V> {
    fn new(value: V, positive: bool) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            positive,
        }
    }

    fn is_expired(&self, positive_ttl: Duration, negative_ttl: Duration) -> bool {
        let ttl = if self.positive {
            positive_ttl
        } else {
            negative_ttl
        };
        self.inserted_at.elapsed() > ttl
    }
}

type SharedOutcome<V> = Result<V, AuthError>;

enum Role<V> {
    Leader(broadcast::Sender<SharedOutcome<V>>),
    Waiter(broadcast::Receiver<SharedOutcome<V>>),
}

/// Removes the in-flight slot when the leader finishes or is dropped
/// mid-compute, so waiters and later callers can make progress.
struct InFlightGuard<'a, V> {
    in_flight: &'a DashMap<String, broadcast::Sender<SharedOutcome<V>>>,
    key: &'a str,
}

impl<V> Drop for InFlightGuard<'_, V> {
    fn drop(&mut self) {
        self.in_flight.remove(self.key);
    }
}

/// Keyed TTL cache with single-flight deduplication.
pub struct TtlCache<V> {
    name: &'static str,
    entries: DashMap<String, CachedValue<V>>,
    in_flight: DashMap<String, broadcast::Sender<SharedOutcome<V>>>,
    positive_ttl: Duration,
    negative_ttl: Duration,
}

impl<V> TtlCache<V>
where
    V: Cacheable + Clone + Send + Sync,
{
    /// Create a cache with the given TTL pair.
    pub fn new(name: &'static str, ttl: CacheTtl) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            positive_ttl: ttl.positive,
            negative_ttl: ttl.negative,
        }
    }

    /// Look the key up, or run `compute` to fill it.
    ///
    /// Returns the value plus whether it was served from the store. At
    /// most one concurrent caller per key runs `compute`; the rest wait
    /// for its outcome. Errors propagate to every waiter and leave the
    /// store untouched.
    pub async fn execute_using_cache<F, Fut>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<(V, bool), AuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, AuthError>>,
    {
        let leader_tx = loop {
            if let Some(entry) = self.entries.get(key) {
                if !entry.is_expired(self.positive_ttl, self.negative_ttl) {
                    return Ok((entry.value.clone(), true));
                }
            }

            let role = match self.in_flight.entry(key.to_owned()) {
                Entry::Occupied(slot) => Role::Waiter(slot.get().subscribe()),
                Entry::Vacant(slot) => {
                    let (tx, _rx) = broadcast::channel(1);
                    slot.insert(tx.clone());
                    Role::Leader(tx)
                }
            };

            match role {
                Role::Leader(tx) => break tx,
                Role::Waiter(mut rx) => match rx.recv().await {
                    Ok(shared) => return shared.map(|value| (value, false)),
                    // The leader was dropped before completing; race for
                    // leadership again.
                    Err(_) => continue,
                },
            }
        };

        debug!(cache = self.name, key, "cache miss, computing");
        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            key,
        };
        let result = compute().await;
        if let Ok(value) = &result {
            self.entries.insert(
                key.to_owned(),
                CachedValue::new(value.clone(), value.is_positive()),
            );
        }
        drop(guard);
        let _ = leader_tx.send(result.clone());
        result.map(|value| (value, false))
    }

    /// Remove a stored entry immediately. Returns whether one existed.
    pub fn bust(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            debug!(cache = self.name, key, "cache entry busted");
        }
        removed
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct TestValue {
        n: u64,
        positive: bool,
    }

    impl Cacheable for TestValue {
        fn is_positive(&self) -> bool {
            self.positive
        }
    }

    fn test_cache(positive_ms: u64, negative_ms: u64) -> Arc<TtlCache<TestValue>> {
        Arc::new(TtlCache::new(
            "test",
            CacheTtl::new(
                Duration::from_millis(positive_ms),
                Duration::from_millis(negative_ms),
            ),
        ))
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = test_cache(1_000, 100);
        let calls = AtomicU64::new(0);

        let (value, hit) = cache
            .execute_using_cache("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(TestValue {
                    n: 7,
                    positive: true,
                })
            })
            .await
            .unwrap();
        assert!(!hit);
        assert_eq!(value.n, 7);

        let (value, hit) = cache
            .execute_using_cache("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(TestValue {
                    n: 8,
                    positive: true,
                })
            })
            .await
            .unwrap();
        assert!(hit);
        assert_eq!(value.n, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_flight_runs_compute_once() {
        let cache = test_cache(1_000, 100);
        let calls = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .execute_using_cache("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(50)).await;
                        Ok(TestValue {
                            n: 42,
                            positive: true,
                        })
                    })
                    .await
            }));
        }

        for handle in handles {
            let (value, _) = handle.await.unwrap().unwrap();
            assert_eq!(value.n, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_positive_ttl_expiry_recomputes() {
        let cache = test_cache(50, 10);
        let calls = AtomicU64::new(0);
        let compute = || async {
            Ok(TestValue {
                n: calls.fetch_add(1, Ordering::SeqCst),
                positive: true,
            })
        };

        let (first, _) = cache.execute_using_cache("k", compute).await.unwrap();
        sleep(Duration::from_millis(80)).await;
        let (second, hit) = cache.execute_using_cache("k", compute).await.unwrap();

        assert!(!hit);
        assert_ne!(first.n, second.n);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_negative_ttl_is_shorter() {
        let cache = test_cache(10_000, 20);
        let calls = AtomicU64::new(0);
        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(TestValue {
                n: 1,
                positive: false,
            })
        };

        cache.execute_using_cache("k", compute).await.unwrap();
        let (_, hit) = cache.execute_using_cache("k", compute).await.unwrap();
        assert!(hit);

        sleep(Duration::from_millis(40)).await;
        let (_, hit) = cache.execute_using_cache("k", compute).await.unwrap();
        assert!(!hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bust_forces_recompute() {
        let cache = test_cache(10_000, 100);
        let calls = AtomicU64::new(0);
        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(TestValue {
                n: 1,
                positive: true,
            })
        };

        cache.execute_using_cache("k", compute).await.unwrap();
        assert!(cache.bust("k"));
        assert!(!cache.bust("k"));

        let (_, hit) = cache.execute_using_cache("k", compute).await.unwrap();
        assert!(!hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_propagate_and_are_not_cached() {
        let cache = test_cache(10_000, 10_000);
        let calls = AtomicU64::new(0);

        let result = cache
            .execute_using_cache("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<TestValue, _>(AuthError::DownstreamNetworkError("rpc down".into()))
            })
            .await;
        assert!(matches!(result, Err(AuthError::DownstreamNetworkError(_))));
        assert!(cache.is_empty());

        let (value, hit) = cache
            .execute_using_cache("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(TestValue {
                    n: 5,
                    positive: true,
                })
            })
            .await
            .unwrap();
        assert!(!hit);
        assert_eq!(value.n, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_fan_out_to_waiters() {
        let cache = test_cache(10_000, 10_000);
        let calls = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .execute_using_cache("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(50)).await;
                        Err::<TestValue, _>(AuthError::DownstreamNetworkError("rpc down".into()))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert!(matches!(
                handle.await.unwrap(),
                Err(AuthError::DownstreamNetworkError(_))
            ));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_leader_unblocks_waiters() {
        let cache = test_cache(10_000, 10_000);

        let leader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .execute_using_cache("k", || async {
                        sleep(Duration::from_secs(60)).await;
                        Ok(TestValue {
                            n: 0,
                            positive: true,
                        })
                    })
                    .await
            })
        };
        // Let the leader claim the in-flight slot, then kill it.
        sleep(Duration::from_millis(20)).await;
        leader.abort();

        let (value, hit) = cache
            .execute_using_cache("k", || async {
                Ok(TestValue {
                    n: 9,
                    positive: true,
                })
            })
            .await
            .unwrap();
        assert!(!hit);
        assert_eq!(value.n, 9);
    }
}
