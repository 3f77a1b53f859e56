//! Ledger-facing types and error definitions.
//!
//! The engine never hands raw RPC response types to its callers. Everything
//! that crosses the [`LedgerRpc`](crate::blockchain::rpc::LedgerRpc) boundary
//! is converted into the small owned types below.

use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::eips::eip2718::{Decodable2718, Encodable2718};
use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the ledger node or the signing collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Endpoint string could not be turned into a connection.
    #[error("Invalid RPC endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Raw transaction bytes could not be decoded.
    #[error("Transaction decode error: {0}")]
    Decode(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// A signed EIP-2718 transaction.
///
/// Serializes as the hex-encoded EIP-2718 envelope so proofs can be written
/// to disk and checked later by another process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Bytes", into = "Bytes")]
pub struct SignedTransaction {
    envelope: TxEnvelope,
}

impl SignedTransaction {
    pub fn new(envelope: TxEnvelope) -> Self {
        Self { envelope }
    }

    /// Transaction hash, the identity used for leaves and cache keys.
    pub fn hash(&self) -> TxHash {
        *self.envelope.tx_hash()
    }

    /// Raw call data (payload envelope plus standard data).
    pub fn input(&self) -> &Bytes {
        self.envelope.input()
    }

    pub fn nonce(&self) -> u64 {
        self.envelope.nonce()
    }

    pub fn to(&self) -> Option<Address> {
        self.envelope.to()
    }

    pub fn value(&self) -> U256 {
        self.envelope.value()
    }

    pub fn gas_limit(&self) -> u64 {
        self.envelope.gas_limit()
    }

    pub fn max_fee_per_gas(&self) -> u128 {
        self.envelope.max_fee_per_gas()
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<u128> {
        self.envelope.max_priority_fee_per_gas()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.envelope.chain_id()
    }

    pub fn envelope(&self) -> &TxEnvelope {
        &self.envelope
    }

    /// EIP-2718 encoding suitable for `eth_sendRawTransaction`.
    pub fn encoded(&self) -> Bytes {
        Bytes::from(self.envelope.encoded_2718())
    }

    /// Decode from EIP-2718 bytes.
    pub fn decode(raw: &[u8]) -> BlockchainResult<Self> {
        let mut buf = raw;
        TxEnvelope::decode_2718(&mut buf)
            .map(Self::new)
            .map_err(|e| BlockchainError::Decode(e.to_string()))
    }
}

impl From<TxEnvelope> for SignedTransaction {
    fn from(envelope: TxEnvelope) -> Self {
        Self::new(envelope)
    }
}

impl From<SignedTransaction> for Bytes {
    fn from(tx: SignedTransaction) -> Self {
        tx.encoded()
    }
}

impl TryFrom<Bytes> for SignedTransaction {
    type Error = BlockchainError;

    fn try_from(raw: Bytes) -> Result<Self, Self::Error> {
        Self::decode(&raw)
    }
}

/// A transaction looked up by hash, with its inclusion state.
#[derive(Debug, Clone)]
pub struct FetchedTransaction {
    pub transaction: SignedTransaction,
    /// True while the transaction sits in the mempool.
    pub pending: bool,
}

/// The fields of a receipt the engine relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub transaction_index: Option<u64>,
    /// Execution status (true = success).
    pub status: bool,
    pub gas_used: u64,
}

/// A finalized block reduced to its ordered transaction hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBlock {
    pub hash: B256,
    pub number: u64,
    pub transactions: Vec<TxHash>,
}

impl LedgerBlock {
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}
