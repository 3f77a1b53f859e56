//! Transaction orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! SendRequest
//!     → manager.rs (nonce, fees, codec framing, signing, dispatch)
//!     → SignedTransaction
//!
//! TxHash (mined)
//!     → manager.rs (receipt, block, merkle path, payload)
//!     → proof.rs (Proof, JSON export)
//!
//! Proof
//!     → manager.rs verify_proof → Ok(()) or a specific VerificationError
//! ```
//!
//! # Design Decisions
//! - Every network-bound operation takes a caller deadline
//! - Failures are counted and surfaced, never retried here
//! - Counters live on the manager instance and are read through snapshots

pub mod codec;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod proof;

pub use codec::{
    build_custom_transaction, decode, encode, is_custom, Decoded, EncodingError, MAGIC_BYTES,
};
pub use error::{EngineError, EngineResult, VerificationError};
pub use manager::{SendRequest, TransactionManager};
pub use metrics::ManagerStats;
pub use proof::Proof;
