//! Connection pooling subsystem.
//!
//! # Data Flow
//! ```text
//! Engine startup
//!     → Connector::connect × N (fail fast, close partial set)
//!     → ConnectionPool (fixed handles, cursor, closed flag)
//!
//! Every RPC-bound operation:
//!     → acquire() → next handle, cursor advanced under the same lock
//!     → call on the handle (no pool lock held across the call)
//! ```
//!
//! # Design Decisions
//! - Fixed size set at construction; no dynamic growth
//! - Round-robin spreads load evenly; strict global order is not promised
//!   across concurrent callers
//! - Close is idempotent and releases each handle exactly once

pub mod connection_pool;

pub use connection_pool::{ConnectionPool, PoolError, PoolResult};
