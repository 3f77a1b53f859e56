//! Ledger and signing collaborators.
//!
//! # Data Flow
//! ```text
//! Private key (env / config input)
//!     → wallet.rs (address derivation, EIP-1559 signing)
//! RPC endpoint
//!     → client.rs (alloy HTTP provider with timeouts)
//!     → rpc.rs (LedgerRpc / Connector traits the core depends on)
//!     → types.rs (owned SignedTransaction, TxReceipt, LedgerBlock)
//! ```
//!
//! # Security Constraints
//! - Private keys never logged
//! - All RPC calls have configurable timeouts
//! - The core only sees the traits and owned types, never provider responses

pub mod client;
pub mod rpc;
pub mod types;
pub mod wallet;

pub use client::{AlloyConnector, AlloyLedger};
pub use rpc::{Connector, LedgerRpc};
pub use types::{
    BlockchainError, BlockchainResult, FetchedTransaction, LedgerBlock,
    SignedTransaction, TxReceipt,
};
pub use wallet::Wallet;
