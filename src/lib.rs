//! Custom Transaction Engine Library
//!
//! Sends EIP-1559 transactions whose calldata carries a framed application
//! payload, and proves their inclusion in a block with a Merkle path over the
//! block's transaction hashes.

pub mod batch;
pub mod blockchain;
pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod merkle;
pub mod nonce;
pub mod observability;
pub mod pool;
pub mod transaction;

pub use batch::{BatchProcessor, BatchRequest, BatchResult, BatchStats};
pub use blockchain::{AlloyConnector, AlloyLedger, Wallet};
pub use config::EngineConfig;
pub use lifecycle::Shutdown;
pub use merkle::MerkleTree;
pub use transaction::{
    EngineError, EngineResult, ManagerStats, Proof, SendRequest, TransactionManager,
    VerificationError,
};
