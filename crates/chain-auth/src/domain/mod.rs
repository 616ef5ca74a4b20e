//! # Domain Layer
//!
//! Core types for authorization decisions: request arguments and cache
//! keys, entitlement records, receipt types, and the error taxonomy.

pub mod entities;
pub mod entitlements;
pub mod errors;
pub mod receipts;

pub use entities::{
    address_hex, deserialize_wallets, serialize_wallets, Address, AuthArgs, AuthKind, Decision,
    EntitlementReason, Hash, MembershipStatus, Permission, StreamId, WalletSet, ZERO_ADDRESS,
};
pub use entitlements::{EntitlementData, EntitlementRecord, RuleDataV1, RuleDataV2, EVERYONE};
pub use errors::AuthError;
pub use receipts::{
    ChainLog, ChainReceipt, ChainTransaction, ReceiptLog, TransactionReceipt,
};
