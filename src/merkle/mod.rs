//! Merkle commitment engine.
//!
//! # Data Flow
//! ```text
//! block transaction hashes (block order)
//!     → MerkleTree::new (layer by layer, keccak256(left ‖ right))
//!     → root / generate_proof(index)
//!
//! proof check
//!     → verify_path(root, leaf_count, leaf, index, siblings)
//! ```
//!
//! # Design Decisions
//! - Unpaired trailing nodes are promoted, never duplicated
//! - Trees are immutable and shared as `Arc<MerkleTree>`
//! - Verification needs only the root and leaf count, not the tree

pub mod tree;

pub use tree::{hash_pair, verify_path, MerkleError, MerkleResult, MerkleTree};
