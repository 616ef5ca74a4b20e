//! # Chain Auth
//!
//! On-chain authorization oracle for a decentralized messaging platform.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Given a (principal, scope, permission) triple, where the scope is a
//! space or a channel inside one, decide whether the principal is
//! entitled, using smart-contract state as the source of truth:
//!
//! - staged decision pipeline with explicit short-circuits and a parallel
//!   membership fan-out where the first fresh member wins
//! - four independently tuned TTL caches with single-flight deduplication
//!   and targeted busting for freshness-critical requests
//! - byte-exact verification of user-submitted transaction receipts
//!   against the chain
//!
//! ## Module Structure
//!
//! ```text
//! chain-auth/
//! ├── domain/          # AuthArgs, entitlement records, receipts, errors
//! ├── cache            # TTL cache with single-flight
//! ├── ports/           # ChainAuthApi; contract and chain client traits
//! ├── adapters/        # in-memory contract and chain fixtures
//! └── service/         # pipeline, entitlement evaluation, receipts
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports
pub use cache::{Cacheable, TtlCache};
pub use config::{
    AuthConfig, CacheTtl, ConfigError, DEFAULT_CONTRACT_CALLS_TIMEOUT_MS,
    DEFAULT_LINKED_WALLETS_LIMIT,
};
pub use domain::{
    address_hex, deserialize_wallets, serialize_wallets, Address, AuthArgs, AuthError, AuthKind,
    ChainLog, ChainReceipt, ChainTransaction, Decision, EntitlementData, EntitlementReason,
    EntitlementRecord, Hash, MembershipStatus, Permission, ReceiptLog, RuleDataV1, RuleDataV2,
    StreamId, TransactionReceipt, WalletSet, EVERYONE, ZERO_ADDRESS,
};
pub use metrics::{AuthMetrics, MetricsSnapshot};
pub use ports::{
    ChainAuthApi, ChainClient, ChainClientRegistry, RuleEvaluator, SpaceContract, WalletLinkClient,
};
pub use service::ChainAuthService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
