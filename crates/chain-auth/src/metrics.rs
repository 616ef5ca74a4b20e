//! # Cache Metrics
//!
//! Hit/miss counters for every cached operation, plus the linked-wallet
//! bust counter. Thread-safe, updated from any worker.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for the authorization caches.
#[derive(Debug, Default)]
pub struct AuthMetrics {
    /// Space decision served from cache.
    pub entitled_to_space_cache_hit: AtomicU64,
    /// Space decision recomputed.
    pub entitled_to_space_cache_miss: AtomicU64,
    /// Channel decision served from cache.
    pub entitled_to_channel_cache_hit: AtomicU64,
    /// Channel decision recomputed.
    pub entitled_to_channel_cache_miss: AtomicU64,
    /// Space-enabled check served from cache.
    pub space_enabled_cache_hit: AtomicU64,
    /// Space-enabled check recomputed.
    pub space_enabled_cache_miss: AtomicU64,
    /// Channel-enabled check served from cache.
    pub channel_enabled_cache_hit: AtomicU64,
    /// Channel-enabled check recomputed.
    pub channel_enabled_cache_miss: AtomicU64,
    /// Entitlement records served from the manager cache.
    pub entitlement_manager_cache_hit: AtomicU64,
    /// Entitlement records fetched from the contract.
    pub entitlement_manager_cache_miss: AtomicU64,
    /// Linked wallets served from cache.
    pub linked_wallet_cache_hit: AtomicU64,
    /// Linked wallets resolved on-chain.
    pub linked_wallet_cache_miss: AtomicU64,
    /// Linked-wallet entries busted for freshness-sensitive requests.
    pub linked_wallet_cache_bust: AtomicU64,
    /// Membership status served from cache.
    pub membership_cache_hit: AtomicU64,
    /// Membership status probed on-chain.
    pub membership_cache_miss: AtomicU64,
}

impl AuthMetrics {
    /// Create a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit or miss on one counter pair.
    pub fn record(&self, hit_counter: &AtomicU64, miss_counter: &AtomicU64, hit: bool) {
        if hit {
            hit_counter.fetch_add(1, Ordering::Relaxed);
        } else {
            miss_counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entitled_to_space_cache_hit: self.entitled_to_space_cache_hit.load(Ordering::Relaxed),
            entitled_to_space_cache_miss: self.entitled_to_space_cache_miss.load(Ordering::Relaxed),
            entitled_to_channel_cache_hit: self
                .entitled_to_channel_cache_hit
                .load(Ordering::Relaxed),
            entitled_to_channel_cache_miss: self
                .entitled_to_channel_cache_miss
                .load(Ordering::Relaxed),
            space_enabled_cache_hit: self.space_enabled_cache_hit.load(Ordering::Relaxed),
            space_enabled_cache_miss: self.space_enabled_cache_miss.load(Ordering::Relaxed),
            channel_enabled_cache_hit: self.channel_enabled_cache_hit.load(Ordering::Relaxed),
            channel_enabled_cache_miss: self.channel_enabled_cache_miss.load(Ordering::Relaxed),
            entitlement_manager_cache_hit: self
                .entitlement_manager_cache_hit
                .load(Ordering::Relaxed),
            entitlement_manager_cache_miss: self
                .entitlement_manager_cache_miss
                .load(Ordering::Relaxed),
            linked_wallet_cache_hit: self.linked_wallet_cache_hit.load(Ordering::Relaxed),
            linked_wallet_cache_miss: self.linked_wallet_cache_miss.load(Ordering::Relaxed),
            linked_wallet_cache_bust: self.linked_wallet_cache_bust.load(Ordering::Relaxed),
            membership_cache_hit: self.membership_cache_hit.load(Ordering::Relaxed),
            membership_cache_miss: self.membership_cache_miss.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`AuthMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub entitled_to_space_cache_hit: u64,
    pub entitled_to_space_cache_miss: u64,
    pub entitled_to_channel_cache_hit: u64,
    pub entitled_to_channel_cache_miss: u64,
    pub space_enabled_cache_hit: u64,
    pub space_enabled_cache_miss: u64,
    pub channel_enabled_cache_hit: u64,
    pub channel_enabled_cache_miss: u64,
    pub entitlement_manager_cache_hit: u64,
    pub entitlement_manager_cache_miss: u64,
    pub linked_wallet_cache_hit: u64,
    pub linked_wallet_cache_miss: u64,
    pub linked_wallet_cache_bust: u64,
    pub membership_cache_hit: u64,
    pub membership_cache_miss: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_zeroed() {
        let metrics = AuthMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_record_routes_to_the_right_counter() {
        let metrics = AuthMetrics::new();
        metrics.record(
            &metrics.membership_cache_hit,
            &metrics.membership_cache_miss,
            true,
        );
        metrics.record(
            &metrics.membership_cache_hit,
            &metrics.membership_cache_miss,
            false,
        );
        metrics.record(
            &metrics.membership_cache_hit,
            &metrics.membership_cache_miss,
            false,
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.membership_cache_hit, 1);
        assert_eq!(snapshot.membership_cache_miss, 2);
        assert_eq!(snapshot.linked_wallet_cache_hit, 0);
    }
}
