//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     owner.trigger() or owner dropped → every subscriber's recv() resolves
//!     → background loop exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → interrupt() resolves → CLI closes the batch pipeline
//! ```
//!
//! # Design Decisions
//! - Cooperative cancellation only; no task is aborted mid-operation
//! - Closing the pipeline drains accepted work before exit

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
