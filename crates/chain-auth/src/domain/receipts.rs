//! # Receipt Types
//!
//! User-submitted transaction receipts and their authoritative chain-side
//! counterparts.
//!
//! The user side keeps raw byte vectors for every field the verifier
//! compares, so verification is a byte-for-byte check against what the
//! chain returned rather than a comparison of parsed values.

use serde::{Deserialize, Serialize};

use super::entities::{Address, Hash};

/// One event log inside a user-submitted receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
    /// Emitting contract address, as uploaded.
    pub address: Vec<u8>,
    /// Log topics, as uploaded.
    pub topics: Vec<Vec<u8>>,
    /// Log data, as uploaded.
    pub data: Vec<u8>,
}

/// A transaction receipt as submitted by a user for verification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Chain the transaction was mined on.
    pub chain_id: u64,
    /// Hash of the transaction.
    pub transaction_hash: Hash,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Recipient address, as uploaded.
    pub to: Vec<u8>,
    /// Sender address, as uploaded.
    pub from: Vec<u8>,
    /// Event logs, as uploaded.
    pub logs: Vec<ReceiptLog>,
}

/// One event log from the authoritative chain receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLog {
    /// Emitting contract address.
    pub address: Address,
    /// Log topics.
    pub topics: Vec<Hash>,
    /// Log data.
    pub data: Vec<u8>,
}

/// The authoritative receipt fetched from a chain client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReceipt {
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Event logs emitted by the transaction.
    pub logs: Vec<ChainLog>,
}

/// The authoritative transaction fetched from a chain client.
///
/// The sender is recovered from the signature by the chain client; this
/// crate only compares it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTransaction {
    /// Recipient address. `None` for contract creation.
    pub to: Option<Address>,
    /// Recovered sender address.
    pub from: Address,
}
