//! # Integration Tests Crate
//!
//! End-to-end authorization flows over the in-memory contract adapters:
//! the full decision pipeline (enabled checks, wallet resolution, the
//! membership race, entitlement evaluation), cache behavior across
//! repeated and concurrent requests, and receipt verification.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! └── src/
//!     ├── lib.rs        # This file + the shared fixture
//!     └── auth_flows.rs # Decision and receipt scenarios
//! ```

pub mod auth_flows;

use std::sync::Arc;

use chain_auth::adapters::{
    InMemoryChainClient, InMemoryChainClientRegistry, InMemorySpaceContract, InMemoryWalletLink,
    StaticRuleEvaluator,
};
use chain_auth::{
    Address, AuthConfig, ChainAuthService, ChainClient, ChainClientRegistry, RuleEvaluator,
    SpaceContract, StreamId, WalletLinkClient,
};

/// Chain id of the fixture's own chain.
pub const BASE_CHAIN_ID: u64 = 31_337;

/// A fully wired authorization service plus handles to every fixture
/// behind it.
pub struct AuthFixture {
    /// The service under test.
    pub service: Arc<ChainAuthService>,
    /// Space contract fixture.
    pub space_contract: Arc<InMemorySpaceContract>,
    /// Wallet-link fixture.
    pub wallet_link: Arc<InMemoryWalletLink>,
    /// Rule evaluator fixture.
    pub rule_evaluator: Arc<StaticRuleEvaluator>,
    /// Chain client registry fixture.
    pub registry: Arc<InMemoryChainClientRegistry>,
    /// The node's own chain.
    pub base_chain: Arc<InMemoryChainClient>,
}

impl AuthFixture {
    /// Build a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(AuthConfig::default())
    }

    /// Build a fixture with a custom configuration.
    pub fn with_config(config: AuthConfig) -> Self {
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
        .expect("fixture config is valid");

        Self {
            service: Arc::new(service),
            space_contract,
            wallet_link,
            rule_evaluator,
            registry,
            base_chain,
        }
    }
}

impl Default for AuthFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Test address with a recognizable last byte.
pub fn addr(n: u8) -> Address {
    let mut a = [0u8; 20];
    a[19] = n;
    a
}

/// Test stream id filled with one byte.
pub fn stream(n: u8) -> StreamId {
    StreamId([n; 32])
}
