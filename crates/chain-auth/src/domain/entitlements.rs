//! # Entitlement Records
//!
//! The on-chain entitlement data attached to a (scope, permission) pair:
//! rule entitlements evaluated by the external rule evaluator, and user
//! entitlements (explicit allowlists).

use serde::{Deserialize, Serialize};

use super::entities::Address;

/// The sentinel "everyone" address: a user entitlement containing it
/// grants the permission to any wallet.
pub const EVERYONE: Address = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
];

/// Legacy rule payload. Must be converted before evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDataV1 {
    /// ABI-encoded rule tree, opaque to this crate.
    pub encoded: Vec<u8>,
}

/// Current rule payload, evaluated over chain predicates by the external
/// rule evaluator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDataV2 {
    /// ABI-encoded rule tree, opaque to this crate.
    pub encoded: Vec<u8>,
}

/// One entitlement record fetched from the space contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementRecord {
    /// Legacy rule entitlement; converted to V2 at evaluation time.
    RuleV1(RuleDataV1),
    /// Rule entitlement over chain predicates.
    RuleV2(RuleDataV2),
    /// Explicit allowlist of addresses. May contain [`EVERYONE`].
    UserList(Vec<Address>),
    /// A module type this node does not understand. Skipped with a
    /// warning during evaluation.
    Unrecognized {
        /// The on-chain module type identifier.
        module_type: String,
    },
}

/// Entitlement records plus the space owner, as cached by the
/// entitlement-manager cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementData {
    /// False when the data looks like a not-found space; such entries
    /// only live for the negative TTL.
    pub cacheable: bool,
    /// The space owner. Ownership overrides every record.
    pub owner: Address,
    /// Records in contract order; the first one that evaluates true wins.
    pub records: Vec<EntitlementRecord>,
}
