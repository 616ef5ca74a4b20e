//! # Adapters
//!
//! In-memory implementations of the outbound ports, with fixture setup,
//! latency and failure injection, and per-method call counters.
//!
//! Production deployments plug real RPC-backed implementations into the
//! same ports; these adapters back the test suites and local simulation.

pub mod chain_client;
pub mod rule_evaluator;
pub mod space_contract;
pub mod wallet_link;

pub use chain_client::{InMemoryChainClient, InMemoryChainClientRegistry};
pub use rule_evaluator::StaticRuleEvaluator;
pub use space_contract::{ContractCalls, InMemorySpaceContract};
pub use wallet_link::InMemoryWalletLink;
