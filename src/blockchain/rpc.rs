//! The RPC boundary the engine is written against.
//!
//! [`LedgerRpc`] is one live connection to a node. [`Connector`] establishes
//! those connections for the pool. The production implementation lives in
//! [`client`](crate::blockchain::client); tests plug in an in-memory ledger.

use alloy::primitives::{Address, TxHash, B256};
use async_trait::async_trait;

use crate::blockchain::types::{
    BlockchainResult, FetchedTransaction, LedgerBlock, SignedTransaction, TxReceipt,
};

/// One connection to a ledger node.
#[async_trait]
pub trait LedgerRpc: Send + Sync + 'static {
    /// Chain identifier used for replay protection.
    async fn chain_id(&self) -> BlockchainResult<u64>;

    /// Next nonce for `address`, counting mempool transactions.
    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64>;

    /// Suggested priority fee (tip) in wei.
    async fn suggested_priority_fee(&self) -> BlockchainResult<u128>;

    /// Base fee of the latest block header. `None` on chains without EIP-1559.
    async fn latest_base_fee(&self) -> BlockchainResult<Option<u64>>;

    /// Broadcast a signed transaction.
    async fn send_transaction(&self, tx: &SignedTransaction) -> BlockchainResult<TxHash>;

    async fn transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<TxReceipt>>;

    async fn transaction_by_hash(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<FetchedTransaction>>;

    /// Block by hash with its transaction hashes in block order.
    async fn block_by_hash(&self, block_hash: B256) -> BlockchainResult<Option<LedgerBlock>>;

    /// Release the underlying transport. Called exactly once by the pool.
    fn close(&self) {}
}

/// Opens connections to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: LedgerRpc;

    async fn connect(&self, endpoint: &str) -> BlockchainResult<Self::Connection>;
}
