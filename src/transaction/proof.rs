//! Inclusion proof for a custom transaction.

use alloy::primitives::{Bytes, TxHash, B256};
use serde::{Deserialize, Serialize};

use crate::blockchain::types::{SignedTransaction, TxReceipt};

/// Everything needed to show a transaction, and the payload it carries,
/// was included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub transaction: SignedTransaction,
    pub block_number: u64,
    pub block_hash: B256,
    pub transaction_index: u64,
    pub receipt: TxReceipt,
    /// Payload extracted from the transaction's calldata.
    pub payload: Bytes,
    /// Sibling digests from leaf to root.
    pub proof_path: Vec<B256>,
}

impl Proof {
    pub fn transaction_hash(&self) -> TxHash {
        self.transaction.hash()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::wallet::Wallet;
    use crate::transaction::codec;
    use alloy::primitives::{Address, U256};

    fn sample_proof() -> Proof {
        let wallet = Wallet::random();
        let tx = codec::build_custom_transaction(
            7,
            0,
            Some(Address::repeat_byte(1)),
            U256::ZERO,
            100_000,
            1,
            3,
            &[],
            b"payload",
        )
        .unwrap();
        let transaction = wallet.sign_transaction(tx).unwrap();
        let hash = transaction.hash();

        Proof {
            transaction,
            block_number: 12,
            block_hash: B256::repeat_byte(0xbb),
            transaction_index: 0,
            receipt: TxReceipt {
                transaction_hash: hash,
                block_hash: Some(B256::repeat_byte(0xbb)),
                block_number: Some(12),
                transaction_index: Some(0),
                status: true,
                gas_used: 21_000,
            },
            payload: Bytes::from_static(b"payload"),
            proof_path: vec![B256::repeat_byte(0x11), B256::repeat_byte(0x22)],
        }
    }

    #[test]
    fn test_json_export_import() {
        let proof = sample_proof();
        let json = proof.to_json().unwrap();
        assert!(json.contains("proof_path"));

        let restored = Proof::from_json(&json).unwrap();
        assert_eq!(restored, proof);
        assert_eq!(restored.transaction_hash(), proof.receipt.transaction_hash);
    }
}
