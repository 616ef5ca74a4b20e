//! In-memory wallet-link client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{address_hex, Address, AuthError};
use crate::ports::WalletLinkClient;

/// In-memory [`WalletLinkClient`] implementation.
#[derive(Default)]
pub struct InMemoryWalletLink {
    links: RwLock<HashMap<Address, Vec<Address>>>,
    failing: AtomicBool,
}

impl InMemoryWalletLink {
    /// Create an empty link registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a wallet to a principal. The principal itself is recorded on
    /// first use, matching the contract's root-key-first ordering.
    pub fn link(&self, principal: Address, wallet: Address) {
        let mut links = self.links.write();
        let entry = links.entry(principal).or_insert_with(|| vec![principal]);
        if !entry.contains(&wallet) {
            entry.push(wallet);
        }
    }

    /// Make every resolution fail with a downstream error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletLinkClient for InMemoryWalletLink {
    async fn linked_wallets(&self, principal: Address) -> Result<Vec<Address>, AuthError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::DownstreamNetworkError(format!(
                "wallet link rpc failed for {}",
                address_hex(&principal)
            )));
        }
        Ok(self
            .links
            .read()
            .get(&principal)
            .cloned()
            .unwrap_or_else(|| vec![principal]))
    }
}
