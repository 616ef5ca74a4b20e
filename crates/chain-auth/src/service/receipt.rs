//! # Receipt Verification
//!
//! Byte-exact validation of a user-submitted transaction receipt against
//! the authoritative chain receipt, plus the one-confirmation check.
//!
//! Any mismatch is a permission denial naming the field and both sides;
//! only transport failures surface as downstream errors.

use tracing::debug;

use crate::domain::{address_hex, AuthError, TransactionReceipt};

use super::ChainAuthService;

impl ChainAuthService {
    pub(crate) async fn verify_receipt_against_chain(
        &self,
        user_receipt: &TransactionReceipt,
    ) -> Result<bool, AuthError> {
        let client = self.chain_registry.client(user_receipt.chain_id)?;
        let tx_hash = user_receipt.transaction_hash;
        let hash_hex = format!("0x{}", hex::encode(tx_hash));

        let chain_receipt = client
            .transaction_receipt(tx_hash)
            .await
            .map_err(|err| err.with_context("failed to fetch transaction receipt"))?;
        let Some(chain_receipt) = chain_receipt else {
            return Err(AuthError::PermissionDenied(format!(
                "transaction receipt not found: {hash_hex}"
            )));
        };

        if chain_receipt.block_number != user_receipt.block_number {
            return Err(AuthError::PermissionDenied(format!(
                "block number mismatch: chain {} uploaded {}",
                chain_receipt.block_number, user_receipt.block_number
            )));
        }

        if chain_receipt.logs.len() != user_receipt.logs.len() {
            return Err(AuthError::PermissionDenied(format!(
                "log count mismatch: chain {} uploaded {}",
                chain_receipt.logs.len(),
                user_receipt.logs.len()
            )));
        }

        for (i, (chain_log, uploaded)) in
            chain_receipt.logs.iter().zip(&user_receipt.logs).enumerate()
        {
            if chain_log.address[..] != uploaded.address[..] {
                return Err(AuthError::PermissionDenied(format!(
                    "log {i} address mismatch: chain {} uploaded 0x{}",
                    address_hex(&chain_log.address),
                    hex::encode(&uploaded.address)
                )));
            }

            if chain_log.topics.len() != uploaded.topics.len() {
                return Err(AuthError::PermissionDenied(format!(
                    "log {i} topic count mismatch: chain {} uploaded {}",
                    chain_log.topics.len(),
                    uploaded.topics.len()
                )));
            }

            for (j, (topic, uploaded_topic)) in
                chain_log.topics.iter().zip(&uploaded.topics).enumerate()
            {
                if topic[..] != uploaded_topic[..] {
                    return Err(AuthError::PermissionDenied(format!(
                        "log {i} topic {j} mismatch: chain 0x{} uploaded 0x{}",
                        hex::encode(topic),
                        hex::encode(uploaded_topic)
                    )));
                }
            }

            if chain_log.data != uploaded.data {
                return Err(AuthError::PermissionDenied(format!("log {i} data mismatch")));
            }
        }

        let transaction = client.transaction_by_hash(tx_hash).await?;
        let Some((transaction, pending)) = transaction else {
            return Err(AuthError::DownstreamNetworkError(format!(
                "transaction not found: {hash_hex}"
            )));
        };
        if pending {
            return Err(AuthError::PermissionDenied(format!(
                "transaction is pending: {hash_hex}"
            )));
        }

        let to_matches = transaction
            .to
            .map(|to| to[..] == user_receipt.to[..])
            .unwrap_or(false);
        if !to_matches {
            let chain_to = transaction
                .to
                .map(|to| address_hex(&to))
                .unwrap_or_else(|| "none".to_string());
            return Err(AuthError::PermissionDenied(format!(
                "to address mismatch: chain {chain_to} uploaded 0x{}",
                hex::encode(&user_receipt.to)
            )));
        }

        if transaction.from[..] != user_receipt.from[..] {
            return Err(AuthError::PermissionDenied(format!(
                "from address mismatch: chain {} uploaded 0x{}",
                address_hex(&transaction.from),
                hex::encode(&user_receipt.from)
            )));
        }

        let latest = self
            .base_chain
            .block_number()
            .await
            .map_err(|err| {
                AuthError::PermissionDenied(format!("failed to get latest block number: {err}"))
            })?;
        let confirmations = latest.saturating_sub(chain_receipt.block_number);
        if confirmations < 1 {
            return Err(AuthError::PermissionDenied(format!(
                "transaction has 0 confirmations: latest block {latest} receipt block {}",
                chain_receipt.block_number
            )));
        }

        debug!(tx_hash = %hash_hex, confirmations, "receipt verified");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{addr, harness, TestHarness, BASE_CHAIN_ID};
    use super::*;
    use crate::domain::{ChainLog, ChainReceipt, ChainTransaction, Hash, ReceiptLog};
    use crate::ports::ChainAuthApi;

    fn tx_hash() -> Hash {
        [0x11; 32]
    }

    fn topic(n: u8) -> Hash {
        [n; 32]
    }

    /// Seed the base chain with one mined transaction and return the
    /// matching user receipt.
    fn seed_receipt(h: &TestHarness) -> TransactionReceipt {
        let chain_log = ChainLog {
            address: addr(7),
            topics: vec![topic(1), topic(2)],
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        h.base_chain.insert_receipt(
            tx_hash(),
            ChainReceipt {
                block_number: 90,
                logs: vec![chain_log],
            },
        );
        h.base_chain.insert_transaction(
            tx_hash(),
            ChainTransaction {
                to: Some(addr(8)),
                from: addr(9),
            },
            false,
        );
        h.base_chain.set_head(100);

        TransactionReceipt {
            chain_id: BASE_CHAIN_ID,
            transaction_hash: tx_hash(),
            block_number: 90,
            to: addr(8).to_vec(),
            from: addr(9).to_vec(),
            logs: vec![ReceiptLog {
                address: addr(7).to_vec(),
                topics: vec![topic(1).to_vec(), topic(2).to_vec()],
                data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            }],
        }
    }

    fn assert_denied(result: Result<bool, AuthError>, needle: &str) {
        match result {
            Err(AuthError::PermissionDenied(msg)) => {
                assert!(msg.contains(needle), "message {msg:?} missing {needle:?}");
            }
            other => panic!("expected PermissionDenied({needle}), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_matching_receipt_verifies() {
        let h = harness();
        let receipt = seed_receipt(&h);
        assert!(h.service.verify_receipt(&receipt).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_chain_is_downstream_error() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.chain_id = 999;
        assert!(matches!(
            h.service.verify_receipt(&receipt).await,
            Err(AuthError::DownstreamNetworkError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_chain_receipt_is_denied() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.transaction_hash = [0x22; 32];
        assert_denied(
            h.service.verify_receipt(&receipt).await,
            "transaction receipt not found",
        );
    }

    #[tokio::test]
    async fn test_rpc_failure_is_downstream_error() {
        let h = harness();
        let receipt = seed_receipt(&h);
        h.base_chain.set_failing(true);
        assert!(matches!(
            h.service.verify_receipt(&receipt).await,
            Err(AuthError::DownstreamNetworkError(_))
        ));
    }

    #[tokio::test]
    async fn test_block_number_mismatch() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.block_number = 91;
        assert_denied(h.service.verify_receipt(&receipt).await, "block number");
    }

    #[tokio::test]
    async fn test_log_count_mismatch() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.logs.push(ReceiptLog::default());
        assert_denied(h.service.verify_receipt(&receipt).await, "log count");
    }

    #[tokio::test]
    async fn test_log_address_single_byte_flip() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.logs[0].address[19] ^= 0x01;
        assert_denied(h.service.verify_receipt(&receipt).await, "address mismatch");
    }

    #[tokio::test]
    async fn test_topic_count_mismatch() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.logs[0].topics.pop();
        assert_denied(h.service.verify_receipt(&receipt).await, "topic count");
    }

    #[tokio::test]
    async fn test_topic_single_byte_flip() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.logs[0].topics[1][0] ^= 0x01;
        assert_denied(h.service.verify_receipt(&receipt).await, "topic 1 mismatch");
    }

    #[tokio::test]
    async fn test_log_data_single_byte_flip() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.logs[0].data[3] ^= 0x01;
        assert_denied(h.service.verify_receipt(&receipt).await, "data mismatch");
    }

    #[tokio::test]
    async fn test_pending_transaction_is_denied() {
        let h = harness();
        let receipt = seed_receipt(&h);
        h.base_chain.insert_transaction(
            tx_hash(),
            ChainTransaction {
                to: Some(addr(8)),
                from: addr(9),
            },
            true,
        );
        assert_denied(h.service.verify_receipt(&receipt).await, "pending");
    }

    #[tokio::test]
    async fn test_to_address_mismatch() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.to[0] ^= 0x01;
        assert_denied(h.service.verify_receipt(&receipt).await, "to address");
    }

    #[tokio::test]
    async fn test_contract_creation_to_is_denied() {
        let h = harness();
        let receipt = seed_receipt(&h);
        h.base_chain.insert_transaction(
            tx_hash(),
            ChainTransaction {
                to: None,
                from: addr(9),
            },
            false,
        );
        assert_denied(h.service.verify_receipt(&receipt).await, "to address");
    }

    #[tokio::test]
    async fn test_from_address_mismatch() {
        let h = harness();
        let mut receipt = seed_receipt(&h);
        receipt.from[19] ^= 0x01;
        assert_denied(h.service.verify_receipt(&receipt).await, "from address");
    }

    #[tokio::test]
    async fn test_zero_confirmations_is_denied() {
        let h = harness();
        let receipt = seed_receipt(&h);
        h.base_chain.set_head(90);
        assert_denied(h.service.verify_receipt(&receipt).await, "0 confirmations");
    }

    #[tokio::test]
    async fn test_one_confirmation_passes() {
        let h = harness();
        let receipt = seed_receipt(&h);
        h.base_chain.set_head(91);
        assert!(h.service.verify_receipt(&receipt).await.unwrap());
    }
}
