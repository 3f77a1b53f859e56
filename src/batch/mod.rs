//! Batch pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! submit(BatchRequest)
//!     → try_send into bounded request queue (full → QueueFull, never waits)
//!     → worker pool (N tasks sharing one receiver)
//!         → TransactionSender::send under per-request timeout
//!         → BatchResult (outcome + duration), counters, latency EMA
//!         → bounded result queue (bounded wait, then drop + count)
//!     → next_result / collect_results
//!
//! close()
//!     → drop request sender → workers drain queue and exit
//!     → last result sender dropped → readers see None
//! ```
//!
//! # Design Decisions
//! - Backpressure is explicit; callers decide whether to retry
//! - A stalled reader can delay workers by at most the publish timeout
//! - `rejected` is counted apart from `queued`

pub mod processor;
pub mod types;

pub use processor::{BatchProcessor, DEFAULT_QUEUE_SIZE, SEND_GRACE};
pub use types::{BatchError, BatchRequest, BatchResult, BatchStats, TransactionSender};
