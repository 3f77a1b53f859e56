//! Nonce sequencing subsystem.
//!
//! # Data Flow
//! ```text
//! send request
//!     → NonceSequencer::next(address)
//!         ├─ cached → return value, advance by one
//!         └─ empty  → NonceSource::pending_nonce (bounded by fetch timeout)
//!                     → seed cache with fetched + 1
//!
//! failed submission
//!     → NonceSequencer::reset(address) → next call re-queries the node
//! ```
//!
//! # Design Decisions
//! - One async lock per address, so the fetch for one sender never blocks
//!   another
//! - The lock is held across the seeding fetch: two first-time callers for
//!   the same address see one fetch and distinct nonces
//! - Node state is authoritative; the cache is only a fast path

pub mod sequencer;

pub use sequencer::{
    NonceError, NonceResult, NonceSequencer, NonceSource, DEFAULT_FETCH_TIMEOUT,
};
