//! # Service Configuration
//!
//! Limits, timeouts, and the per-cache TTL pairs. Non-positive values for
//! the wallet limit and contract-call timeout fall back to their defaults
//! rather than erroring, so half-configured deployments stay usable.

use std::time::Duration;
use thiserror::Error;

/// Default cap on the number of linked wallets a decision fans out over.
pub const DEFAULT_LINKED_WALLETS_LIMIT: usize = 10;

/// Default budget for all contract calls inside a single decision.
pub const DEFAULT_CONTRACT_CALLS_TIMEOUT_MS: u64 = 10_000;

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A TTL was set to zero.
    #[error("invalid ttl for {cache}: {which} ttl must be non-zero")]
    ZeroTtl {
        /// Which cache the TTL belongs to.
        cache: &'static str,
        /// "positive" or "negative".
        which: &'static str,
    },
}

/// Positive/negative TTL pair for one cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtl {
    /// Lifetime of values marked positive (cacheable long-term).
    pub positive: Duration,
    /// Lifetime of values marked negative (recheck soon).
    pub negative: Duration,
}

impl CacheTtl {
    /// Construct a TTL pair.
    pub fn new(positive: Duration, negative: Duration) -> Self {
        Self { positive, negative }
    }

    fn validate(&self, cache: &'static str) -> Result<(), ConfigError> {
        if self.positive.is_zero() {
            return Err(ConfigError::ZeroTtl {
                cache,
                which: "positive",
            });
        }
        if self.negative.is_zero() {
            return Err(ConfigError::ZeroTtl {
                cache,
                which: "negative",
            });
        }
        Ok(())
    }
}

/// Configuration for [`ChainAuthService`](crate::service::ChainAuthService).
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Cap on linked wallets per decision. Exceeding it fails the
    /// decision with a resource-exhausted error.
    pub linked_wallets_limit: usize,
    /// Budget for all contract calls inside a single decision.
    pub contract_calls_timeout: Duration,
    /// TTLs for the decision/enabled cache.
    pub entitlement_cache_ttl: CacheTtl,
    /// TTLs for the entitlement-manager cache. Shorter positive TTL:
    /// entitlement records change more dynamically than stream state.
    pub entitlement_manager_cache_ttl: CacheTtl,
    /// TTLs for the linked-wallet cache.
    pub linked_wallet_cache_ttl: CacheTtl,
    /// TTLs for the membership cache.
    pub membership_cache_ttl: CacheTtl,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let long = CacheTtl::new(Duration::from_secs(15 * 60), Duration::from_secs(2));
        Self {
            linked_wallets_limit: DEFAULT_LINKED_WALLETS_LIMIT,
            contract_calls_timeout: Duration::from_millis(DEFAULT_CONTRACT_CALLS_TIMEOUT_MS),
            entitlement_cache_ttl: long,
            entitlement_manager_cache_ttl: CacheTtl::new(
                Duration::from_secs(10),
                Duration::from_secs(2),
            ),
            linked_wallet_cache_ttl: long,
            membership_cache_ttl: long,
        }
    }
}

impl AuthConfig {
    /// Build a configuration from the two operator-tunable knobs,
    /// clamping non-positive values to their defaults.
    pub fn new(linked_wallets_limit: usize, contract_calls_timeout_ms: u64) -> Self {
        let mut config = Self::default();
        if linked_wallets_limit > 0 {
            config.linked_wallets_limit = linked_wallets_limit;
        }
        if contract_calls_timeout_ms > 0 {
            config.contract_calls_timeout = Duration::from_millis(contract_calls_timeout_ms);
        }
        config
    }

    /// Override the decision/enabled cache TTLs.
    pub fn with_entitlement_cache_ttl(mut self, ttl: CacheTtl) -> Self {
        self.entitlement_cache_ttl = ttl;
        self
    }

    /// Override the entitlement-manager cache TTLs.
    pub fn with_entitlement_manager_cache_ttl(mut self, ttl: CacheTtl) -> Self {
        self.entitlement_manager_cache_ttl = ttl;
        self
    }

    /// Override the linked-wallet cache TTLs.
    pub fn with_linked_wallet_cache_ttl(mut self, ttl: CacheTtl) -> Self {
        self.linked_wallet_cache_ttl = ttl;
        self
    }

    /// Override the membership cache TTLs.
    pub fn with_membership_cache_ttl(mut self, ttl: CacheTtl) -> Self {
        self.membership_cache_ttl = ttl;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.entitlement_cache_ttl.validate("entitlement")?;
        self.entitlement_manager_cache_ttl
            .validate("entitlement_manager")?;
        self.linked_wallet_cache_ttl.validate("linked_wallet")?;
        self.membership_cache_ttl.validate("membership")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.linked_wallets_limit, 10);
        assert_eq!(config.contract_calls_timeout, Duration::from_secs(10));
        assert_eq!(
            config.entitlement_cache_ttl.positive,
            Duration::from_secs(900)
        );
        assert_eq!(config.entitlement_cache_ttl.negative, Duration::from_secs(2));
        assert_eq!(
            config.entitlement_manager_cache_ttl.positive,
            Duration::from_secs(10)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_knobs_fall_back_to_defaults() {
        let config = AuthConfig::new(0, 0);
        assert_eq!(config.linked_wallets_limit, DEFAULT_LINKED_WALLETS_LIMIT);
        assert_eq!(
            config.contract_calls_timeout,
            Duration::from_millis(DEFAULT_CONTRACT_CALLS_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_explicit_knobs_are_kept() {
        let config = AuthConfig::new(3, 500);
        assert_eq!(config.linked_wallets_limit, 3);
        assert_eq!(config.contract_calls_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = AuthConfig::default().with_membership_cache_ttl(CacheTtl::new(
            Duration::ZERO,
            Duration::from_secs(2),
        ));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroTtl {
                cache: "membership",
                which: "positive"
            })
        ));
    }
}
