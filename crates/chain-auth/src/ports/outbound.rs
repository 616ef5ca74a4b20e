//! # Outbound Ports
//!
//! Traits for the on-chain collaborators: the space contract, the
//! wallet-link contract, the rule evaluator, and chain RPC clients.
//!
//! Retry and backoff are the implementations' concern; this crate treats
//! a failed call as failed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    Address, AuthError, ChainReceipt, ChainTransaction, EntitlementRecord, Hash,
    MembershipStatus, Permission, RuleDataV1, RuleDataV2, StreamId,
};

/// The space diamond contract: stream state, entitlements, membership,
/// and bans.
#[async_trait]
pub trait SpaceContract: Send + Sync {
    /// Whether the space has been disabled.
    async fn is_space_disabled(&self, space_id: StreamId) -> Result<bool, AuthError>;

    /// Whether the channel has been disabled.
    async fn is_channel_disabled(
        &self,
        space_id: StreamId,
        channel_id: StreamId,
    ) -> Result<bool, AuthError>;

    /// Entitlement records governing `permission` on the space, plus the
    /// space owner.
    async fn space_entitlements_for_permission(
        &self,
        space_id: StreamId,
        permission: Permission,
    ) -> Result<(Vec<EntitlementRecord>, Address), AuthError>;

    /// Entitlement records governing `permission` on the channel, plus
    /// the space owner.
    async fn channel_entitlements_for_permission(
        &self,
        space_id: StreamId,
        channel_id: StreamId,
        permission: Permission,
    ) -> Result<(Vec<EntitlementRecord>, Address), AuthError>;

    /// Whether any of the wallets is banned from the space.
    async fn is_banned(&self, space_id: StreamId, wallets: &[Address]) -> Result<bool, AuthError>;

    /// Membership status of a single wallet in the space.
    async fn membership_status(
        &self,
        space_id: StreamId,
        wallet: Address,
    ) -> Result<MembershipStatus, AuthError>;
}

/// The wallet-link contract: resolves the wallets bound to a principal.
#[async_trait]
pub trait WalletLinkClient: Send + Sync {
    /// All wallets linked to the principal, in contract order.
    async fn linked_wallets(&self, principal: Address) -> Result<Vec<Address>, AuthError>;
}

/// External evaluator for rule entitlements.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    /// Upgrade a legacy rule payload to the current version.
    fn convert_v1_to_v2(&self, rule: &RuleDataV1) -> Result<RuleDataV2, AuthError>;

    /// Evaluate a rule tree over the wallet set. May fan out into chain
    /// reads of its own.
    async fn evaluate(&self, wallets: &[Address], rule: &RuleDataV2) -> Result<bool, AuthError>;
}

/// Read-only client for one chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The chain this client talks to.
    fn chain_id(&self) -> u64;

    /// Receipt for a mined transaction. `None` when the chain does not
    /// know the transaction.
    async fn transaction_receipt(&self, tx_hash: Hash) -> Result<Option<ChainReceipt>, AuthError>;

    /// The transaction itself plus whether it is still pending. `None`
    /// when unknown.
    async fn transaction_by_hash(
        &self,
        tx_hash: Hash,
    ) -> Result<Option<(ChainTransaction, bool)>, AuthError>;

    /// Current head block number.
    async fn block_number(&self) -> Result<u64, AuthError>;
}

/// Registry of chain clients by chain id.
pub trait ChainClientRegistry: Send + Sync {
    /// The client for `chain_id`, or a downstream error when none is
    /// configured.
    fn client(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>, AuthError>;
}
