//! Error types for the transaction orchestrator.

use alloy::primitives::{TxHash, B256};
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::types::BlockchainError;
use crate::merkle::MerkleError;
use crate::nonce::NonceError;
use crate::pool::PoolError;
use crate::transaction::codec::EncodingError;

/// A proof that does not hold against the chain. Each check fails with its
/// own variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("transaction index {index} out of range for block with {count} transactions")]
    IndexOutOfRange { index: u64, count: usize },

    #[error("transaction hash mismatch: block has {in_block}, proof has {in_proof}")]
    HashMismatch { in_block: TxHash, in_proof: TxHash },

    #[error("receipt references {receipt}, transaction hashes to {transaction}")]
    ReceiptMismatch { receipt: TxHash, transaction: TxHash },

    #[error("merkle path does not lead to the block root")]
    MerkleMismatch,

    #[error("embedded payload differs from the payload recorded in the proof")]
    PayloadMismatch,
}

/// Errors surfaced by [`TransactionManager`](crate::transaction::TransactionManager).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Nonce(#[from] NonceError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error("proof verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("latest block has no base fee; the chain does not support EIP-1559")]
    MissingBaseFee,

    #[error("fee cap {fee_cap} wei exceeds configured maximum {max} wei")]
    FeeTooHigh { fee_cap: u128, max: u128 },

    #[error("receipt not found for {0}")]
    ReceiptNotFound(TxHash),

    #[error("transaction {0} not found")]
    TransactionNotFound(TxHash),

    #[error("transaction {0} is still pending")]
    TransactionPending(TxHash),

    #[error("block {0} not found")]
    BlockNotFound(B256),

    #[error("block {block_hash} lists another transaction at index {index}")]
    InconsistentBlock { block_hash: B256, index: u64 },
}

impl EngineError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blockchain(_) => "rpc",
            Self::Pool(_) => "pool",
            Self::Nonce(_) => "nonce",
            Self::Encoding(_) => "encoding",
            Self::Merkle(_) => "merkle",
            Self::Verification(_) => "verification",
            Self::Timeout { .. } => "timeout",
            Self::MissingBaseFee | Self::FeeTooHigh { .. } => "fee",
            Self::ReceiptNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::TransactionPending(_)
            | Self::BlockNotFound(_)
            | Self::InconsistentBlock { .. } => "lookup",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
