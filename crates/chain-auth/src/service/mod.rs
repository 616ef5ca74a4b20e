//! # Authorization Service
//!
//! [`ChainAuthService`] wires the decision pipeline to its collaborators
//! and owns the four caches and the metrics counters. One instance serves
//! the whole process; all methods are safe for concurrent invocation.

mod entitlements;
mod pipeline;
mod receipt;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::cache::TtlCache;
use crate::config::{AuthConfig, ConfigError};
use crate::domain::{
    Address, AuthArgs, AuthError, Decision, EntitlementData, MembershipStatus, StreamId,
    TransactionReceipt, WalletSet,
};
use crate::metrics::{AuthMetrics, MetricsSnapshot};
use crate::ports::{
    ChainAuthApi, ChainClient, ChainClientRegistry, RuleEvaluator, SpaceContract, WalletLinkClient,
};

/// The authorization oracle.
///
/// Decisions flow through a staged pipeline: enabled check,
/// linked-wallet resolution, membership fan-out, entitlement
/// evaluation. Each stage is backed by its own cache so results are
/// shared across requests that only partially overlap.
pub struct ChainAuthService {
    pub(crate) config: AuthConfig,
    pub(crate) space_contract: Arc<dyn SpaceContract>,
    pub(crate) wallet_link: Option<Arc<dyn WalletLinkClient>>,
    pub(crate) rule_evaluator: Arc<dyn RuleEvaluator>,
    pub(crate) chain_registry: Arc<dyn ChainClientRegistry>,
    pub(crate) base_chain: Arc<dyn ChainClient>,
    pub(crate) entitlement_cache: TtlCache<Decision>,
    pub(crate) entitlement_manager_cache: TtlCache<EntitlementData>,
    pub(crate) linked_wallet_cache: TtlCache<WalletSet>,
    pub(crate) membership_cache: Arc<TtlCache<MembershipStatus>>,
    pub(crate) metrics: Arc<AuthMetrics>,
}

impl ChainAuthService {
    /// Build a service from its collaborators.
    ///
    /// `wallet_link` may be absent; resolution then degrades to the root
    /// key only.
    pub fn new(
        config: AuthConfig,
        space_contract: Arc<dyn SpaceContract>,
        wallet_link: Option<Arc<dyn WalletLinkClient>>,
        rule_evaluator: Arc<dyn RuleEvaluator>,
        chain_registry: Arc<dyn ChainClientRegistry>,
        base_chain: Arc<dyn ChainClient>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if wallet_link.is_none() {
            warn!("wallet link contract is not configured; wallet resolution degrades to the root key only");
        }
        Ok(Self {
            entitlement_cache: TtlCache::new("entitlement", config.entitlement_cache_ttl),
            entitlement_manager_cache: TtlCache::new(
                "entitlement_manager",
                config.entitlement_manager_cache_ttl,
            ),
            linked_wallet_cache: TtlCache::new("linked_wallet", config.linked_wallet_cache_ttl),
            membership_cache: Arc::new(TtlCache::new("membership", config.membership_cache_ttl)),
            metrics: Arc::new(AuthMetrics::new()),
            config,
            space_contract,
            wallet_link,
            rule_evaluator,
            chain_registry,
            base_chain,
        })
    }

    /// Current cache counter values.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl ChainAuthApi for ChainAuthService {
    async fn is_entitled(&self, args: &AuthArgs) -> Result<Decision, AuthError> {
        let (decision, _) = self
            .entitlement_cache
            .execute_using_cache(&args.cache_key(), || self.check_entitlement(args))
            .await
            .map_err(|err| err.with_context("is_entitled"))?;
        Ok(decision)
    }

    async fn verify_receipt(&self, receipt: &TransactionReceipt) -> Result<bool, AuthError> {
        self.verify_receipt_against_chain(receipt).await
    }

    async fn get_membership_status(
        &self,
        space_id: StreamId,
        principal: Address,
    ) -> Result<MembershipStatus, AuthError> {
        pipeline::probe_membership(
            &self.membership_cache,
            &self.space_contract,
            &self.metrics,
            space_id,
            principal,
        )
        .await
        .map_err(|err| {
            err.with_context(&format!(
                "get_membership_status failed for space {space_id}"
            ))
        })
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::adapters::{
        InMemoryChainClient, InMemoryChainClientRegistry, InMemorySpaceContract,
        InMemoryWalletLink, StaticRuleEvaluator,
    };

    pub(crate) const BASE_CHAIN_ID: u64 = 31_337;

    /// A fully wired service over the in-memory adapters, with handles to
    /// every fixture kept alongside.
    pub(crate) struct TestHarness {
        pub service: ChainAuthService,
        pub space_contract: Arc<InMemorySpaceContract>,
        pub wallet_link: Arc<InMemoryWalletLink>,
        pub rule_evaluator: Arc<StaticRuleEvaluator>,
        pub registry: Arc<InMemoryChainClientRegistry>,
        pub base_chain: Arc<InMemoryChainClient>,
    }

    pub(crate) fn harness() -> TestHarness {
        harness_with_config(AuthConfig::default())
    }

    pub(crate) fn harness_with_config(config: AuthConfig) -> TestHarness {
        let space_contract = Arc::new(InMemorySpaceContract::new());
        let wallet_link = Arc::new(InMemoryWalletLink::new());
        let rule_evaluator = Arc::new(StaticRuleEvaluator::new());
        let registry = Arc::new(InMemoryChainClientRegistry::new());
        let base_chain = Arc::new(InMemoryChainClient::new(BASE_CHAIN_ID));
        base_chain.set_head(100);
        registry.register(Arc::clone(&base_chain) as Arc<dyn ChainClient>);

        let service = ChainAuthService::new(
            config,
            Arc::clone(&space_contract) as Arc<dyn SpaceContract>,
            Some(Arc::clone(&wallet_link) as Arc<dyn WalletLinkClient>),
            Arc::clone(&rule_evaluator) as Arc<dyn RuleEvaluator>,
            Arc::clone(&registry) as Arc<dyn ChainClientRegistry>,
            Arc::clone(&base_chain) as Arc<dyn ChainClient>,
        )
        .expect("default config is valid");

        TestHarness {
            service,
            space_contract,
            wallet_link,
            rule_evaluator,
            registry,
            base_chain,
        }
    }

    pub(crate) fn addr(n: u8) -> Address {
        let mut a = [0u8; 20];
        a[19] = n;
        a
    }

    pub(crate) fn stream(n: u8) -> StreamId {
        StreamId([n; 32])
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::{addr, harness, stream};
    use super::*;

    #[tokio::test]
    async fn test_get_membership_status_uses_the_membership_cache() {
        let h = harness();
        let space = stream(1);
        h.space_contract.add_space(space, addr(1));
        h.space_contract
            .set_membership(space, addr(2), MembershipStatus::fresh(9_999));

        let status = h.service.get_membership_status(space, addr(2)).await.unwrap();
        assert!(status.is_member);
        let status = h.service.get_membership_status(space, addr(2)).await.unwrap();
        assert!(status.is_member);

        let snapshot = h.service.metrics_snapshot();
        assert_eq!(snapshot.membership_cache_miss, 1);
        assert_eq!(snapshot.membership_cache_hit, 1);
        assert_eq!(
            h.space_contract
                .calls()
                .membership_status
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_get_membership_status_for_unknown_wallet() {
        let h = harness();
        let space = stream(1);
        h.space_contract.add_space(space, addr(1));

        let status = h.service.get_membership_status(space, addr(7)).await.unwrap();
        assert!(!status.is_member);
        assert!(!status.is_expired);
    }
}
