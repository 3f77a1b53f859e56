//! Cache tier.
//!
//! # Data Flow
//! ```text
//! generate_proof(tx)
//!     → TtlCache<TxHash, Arc<Proof>>  (30 min window, swept every 5 min)
//!     → RecencyCache<TxHash, TxReceipt> (1000 entries)
//! verify_proof / merkle_tree(block)
//!     → RecencyCache<B256, LedgerBlock> (100 entries)
//! ```
//!
//! # Design Decisions
//! - Generic per instance; the owner picks key and value types
//! - Keys are content hashes, so staleness is not a concern for blocks and
//!   receipts and recency alone bounds memory
//! - Shape validators turn a mismatched entry into a miss instead of an error
//! - The sweeper task belongs to its cache and stops on close or drop

pub mod recency;
pub mod ttl;

pub use recency::{RecencyCache, Validator, DEFAULT_CAPACITY};
pub use ttl::{TtlCache, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
