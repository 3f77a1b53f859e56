//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys are loaded from configuration input or the environment only
//! - Keys are never logged or serialized

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::blockchain::types::{BlockchainError, BlockchainResult, SignedTransaction};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "TXENGINE_PRIVATE_KEY";

/// Signing identity of the engine.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// Accepts the key with or without a `0x` prefix.
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Wallet initialized");

        Ok(Self { signer })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `TXENGINE_PRIVATE_KEY` from environment.
    pub fn from_env() -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Create a wallet with a fresh random key.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign an EIP-1559 transaction.
    ///
    /// The chain ID carried by `tx` is what binds the signature to a network.
    pub fn sign_transaction(&self, tx: TxEip1559) -> BlockchainResult<SignedTransaction> {
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        Ok(SignedTransaction::new(TxEnvelope::Eip1559(
            tx.into_signed(signature),
        )))
    }
}
