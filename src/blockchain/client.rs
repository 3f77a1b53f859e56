//! Alloy-backed RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to a JSON-RPC endpoint over HTTP
//! - Answer the [`LedgerRpc`] queries the engine needs
//! - Bound every call with a timeout and map transport errors
//! - Convert RPC response types into the engine's own ledger types

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, TxHash, B256};
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::rpc::{Connector, LedgerRpc};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, FetchedTransaction, LedgerBlock, SignedTransaction,
    TxReceipt,
};

/// One HTTP connection to a node.
#[derive(Clone)]
pub struct AlloyLedger {
    provider: Arc<dyn Provider + Send + Sync>,
    endpoint: String,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl AlloyLedger {
    /// Build a ledger client for `endpoint`. Does not touch the network.
    pub fn new(endpoint: &str, timeout_duration: Duration) -> BlockchainResult<Self> {
        let url: url::Url = endpoint.parse().map_err(|e: url::ParseError| {
            BlockchainError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?;

        let provider = ProviderBuilder::new().connect_http(url);
        Ok(Self {
            provider: Arc::new(provider) as Arc<dyn Provider + Send + Sync>,
            endpoint: endpoint.to_string(),
            timeout_duration,
        })
    }

    /// The endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the underlying provider.
    pub fn provider(&self) -> &(dyn Provider + Send + Sync) {
        self.provider.as_ref()
    }

    async fn call<T, E, F>(&self, operation: &'static str, fut: F) -> BlockchainResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(endpoint = %self.endpoint, operation, error = %e, "RPC error");
                Err(BlockchainError::Rpc(format!("{operation}: {e}")))
            }
            Err(_) => {
                tracing::warn!(endpoint = %self.endpoint, operation, "RPC timeout");
                Err(BlockchainError::Timeout {
                    operation,
                    timeout: self.timeout_duration,
                })
            }
        }
    }
}

#[async_trait]
impl LedgerRpc for AlloyLedger {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.call("eth_chainId", self.provider.get_chain_id()).await
    }

    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.call(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address).pending(),
        )
        .await
    }

    async fn suggested_priority_fee(&self) -> BlockchainResult<u128> {
        self.call(
            "eth_maxPriorityFeePerGas",
            self.provider.get_max_priority_fee_per_gas(),
        )
        .await
    }

    async fn latest_base_fee(&self) -> BlockchainResult<Option<u64>> {
        let block = self
            .call(
                "eth_getBlockByNumber",
                self.provider.get_block_by_number(BlockNumberOrTag::Latest),
            )
            .await?
            .ok_or_else(|| BlockchainError::Rpc("latest block not available".to_string()))?;
        Ok(block.header.base_fee_per_gas)
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> BlockchainResult<TxHash> {
        let raw = tx.encoded();
        let pending = self
            .call(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(&raw),
            )
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<TxReceipt>> {
        let receipt = self
            .call(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(tx_hash),
            )
            .await?;

        Ok(receipt.map(|r| TxReceipt {
            transaction_hash: r.transaction_hash,
            block_hash: r.block_hash,
            block_number: r.block_number,
            transaction_index: r.transaction_index,
            status: r.status(),
            gas_used: r.gas_used,
        }))
    }

    async fn transaction_by_hash(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<FetchedTransaction>> {
        let tx = self
            .call(
                "eth_getTransactionByHash",
                self.provider.get_transaction_by_hash(tx_hash),
            )
            .await?;

        Ok(tx.map(|tx| {
            let pending = tx.block_hash.is_none();
            FetchedTransaction {
                transaction: SignedTransaction::new(tx.inner.into_inner()),
                pending,
            }
        }))
    }

    async fn block_by_hash(&self, block_hash: B256) -> BlockchainResult<Option<LedgerBlock>> {
        let block = self
            .call(
                "eth_getBlockByHash",
                self.provider.get_block_by_hash(block_hash),
            )
            .await?;

        Ok(block.map(|b| LedgerBlock {
            hash: b.header.hash,
            number: b.header.number,
            transactions: b.transactions.hashes().collect(),
        }))
    }

    fn close(&self) {
        tracing::debug!(endpoint = %self.endpoint, "RPC connection released");
    }
}

impl std::fmt::Debug for AlloyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyLedger")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}

/// Opens [`AlloyLedger`] connections.
///
/// HTTP transports connect lazily, so every new connection is probed with
/// `eth_chainId` to fail fast on an unreachable endpoint.
#[derive(Debug, Clone)]
pub struct AlloyConnector {
    timeout_duration: Duration,
}

impl AlloyConnector {
    pub fn new(timeout_duration: Duration) -> Self {
        Self { timeout_duration }
    }
}

#[async_trait]
impl Connector for AlloyConnector {
    type Connection = AlloyLedger;

    async fn connect(&self, endpoint: &str) -> BlockchainResult<AlloyLedger> {
        let ledger = AlloyLedger::new(endpoint, self.timeout_duration)?;
        let chain_id = ledger.chain_id().await?;
        tracing::debug!(endpoint, chain_id, "RPC connection established");
        Ok(ledger)
    }
}
