//! # Ports
//!
//! Inbound and outbound interfaces of the authorization oracle.
//!
//! The inbound port is what request handlers call; the outbound ports are
//! the contract and chain collaborators this crate consumes. Concrete RPC
//! adapters live outside; in-memory adapters for tests live in
//! [`crate::adapters`].

pub mod inbound;
pub mod outbound;

pub use inbound::ChainAuthApi;
pub use outbound::{
    ChainClient, ChainClientRegistry, RuleEvaluator, SpaceContract, WalletLinkClient,
};
