//! # Inbound Port
//!
//! The decision API exposed to request handlers.

use async_trait::async_trait;

use crate::domain::{
    Address, AuthArgs, AuthError, Decision, MembershipStatus, StreamId, TransactionReceipt,
};

/// Authorization decisions backed by on-chain state.
#[async_trait]
pub trait ChainAuthApi: Send + Sync {
    /// Decide whether the principal described by `args` is entitled.
    ///
    /// Denials are values, not errors: `Ok` with `allowed == false`
    /// carries the reason code. Errors mean the decision could not be
    /// made at all.
    async fn is_entitled(&self, args: &AuthArgs) -> Result<Decision, AuthError>;

    /// Validate a user-submitted transaction receipt against the chain.
    async fn verify_receipt(&self, receipt: &TransactionReceipt) -> Result<bool, AuthError>;

    /// Membership status of a wallet in a space, served from the
    /// membership cache.
    async fn get_membership_status(
        &self,
        space_id: StreamId,
        principal: Address,
    ) -> Result<MembershipStatus, AuthError>;
}
