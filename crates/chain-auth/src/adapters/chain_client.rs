//! In-memory chain client and registry.
//!
//! Receipts, transactions, and the head block number are plain maps and
//! an atomic; a failure flag simulates an unreachable RPC endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{AuthError, ChainReceipt, ChainTransaction, Hash};
use crate::ports::{ChainClient, ChainClientRegistry};

/// In-memory [`ChainClient`] implementation.
pub struct InMemoryChainClient {
    chain_id: u64,
    head: AtomicU64,
    receipts: RwLock<HashMap<Hash, ChainReceipt>>,
    transactions: RwLock<HashMap<Hash, (ChainTransaction, bool)>>,
    failing: AtomicBool,
}

impl InMemoryChainClient {
    /// Create a client for `chain_id` with an empty chain.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            head: AtomicU64::new(0),
            receipts: RwLock::new(HashMap::new()),
            transactions: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Set the head block number.
    pub fn set_head(&self, block_number: u64) {
        self.head.store(block_number, Ordering::SeqCst);
    }

    /// Store a mined receipt.
    pub fn insert_receipt(&self, tx_hash: Hash, receipt: ChainReceipt) {
        self.receipts.write().insert(tx_hash, receipt);
    }

    /// Store a transaction and whether it is still pending.
    pub fn insert_transaction(&self, tx_hash: Hash, tx: ChainTransaction, pending: bool) {
        self.transactions.write().insert(tx_hash, (tx, pending));
    }

    /// Make every call fail with a downstream error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), AuthError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::DownstreamNetworkError(format!(
                "chain {} rpc unreachable",
                self.chain_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for InMemoryChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn transaction_receipt(&self, tx_hash: Hash) -> Result<Option<ChainReceipt>, AuthError> {
        self.check_reachable()?;
        Ok(self.receipts.read().get(&tx_hash).cloned())
    }

    async fn transaction_by_hash(
        &self,
        tx_hash: Hash,
    ) -> Result<Option<(ChainTransaction, bool)>, AuthError> {
        self.check_reachable()?;
        Ok(self.transactions.read().get(&tx_hash).cloned())
    }

    async fn block_number(&self) -> Result<u64, AuthError> {
        self.check_reachable()?;
        Ok(self.head.load(Ordering::SeqCst))
    }
}

/// In-memory [`ChainClientRegistry`] implementation.
#[derive(Default)]
pub struct InMemoryChainClientRegistry {
    clients: RwLock<HashMap<u64, Arc<dyn ChainClient>>>,
}

impl InMemoryChainClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its own chain id.
    pub fn register(&self, client: Arc<dyn ChainClient>) {
        self.clients.write().insert(client.chain_id(), client);
    }
}

impl ChainClientRegistry for InMemoryChainClientRegistry {
    fn client(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>, AuthError> {
        self.clients.read().get(&chain_id).cloned().ok_or_else(|| {
            AuthError::DownstreamNetworkError(format!("no chain client for chain {chain_id}"))
        })
    }
}
