//! Batch request, result and statistics types.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

use crate::blockchain::rpc::LedgerRpc;
use crate::blockchain::types::SignedTransaction;
use crate::transaction::{EngineError, EngineResult, SendRequest, TransactionManager};

/// What the pipeline drives. Implemented by [`TransactionManager`].
#[async_trait]
pub trait TransactionSender: Send + Sync + 'static {
    async fn send(
        &self,
        request: &SendRequest,
        timeout: Duration,
    ) -> EngineResult<SignedTransaction>;
}

#[async_trait]
impl<C: LedgerRpc> TransactionSender for TransactionManager<C> {
    async fn send(
        &self,
        request: &SendRequest,
        timeout: Duration,
    ) -> EngineResult<SignedTransaction> {
        TransactionManager::send(self, request, timeout).await
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("batch processor is closed")]
    Closed,

    #[error("batch queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },
}

/// One transaction submitted to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub id: Uuid,
    pub to: Address,
    pub value: Option<U256>,
    pub payload: Bytes,
    pub data: Bytes,
    /// Set when the request is accepted.
    pub submitted_at: Option<Instant>,
}

impl BatchRequest {
    pub fn new(to: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            to,
            value: None,
            payload: payload.into(),
            data: Bytes::new(),
            submitted_at: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub(crate) fn to_send_request(&self) -> SendRequest {
        SendRequest {
            to: self.to,
            value: self.value,
            payload: self.payload.clone(),
            data: self.data.clone(),
        }
    }
}

/// Outcome of one accepted request.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub request: BatchRequest,
    pub outcome: Result<SignedTransaction, EngineError>,
    /// Time spent in `send`, excluding queue wait.
    pub duration: Duration,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        self.outcome.as_ref().ok().map(SignedTransaction::hash)
    }

    /// Time between acceptance and the end of processing.
    pub fn latency(&self) -> Option<Duration> {
        self.request.submitted_at.map(|at| at.elapsed())
    }
}

/// Point-in-time view of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Requests accepted into the queue.
    pub queued: u64,
    /// Submissions refused because the queue was full.
    pub rejected: u64,
    /// Requests that finished, successfully or not.
    pub processed: u64,
    /// Finished requests whose send failed.
    pub failed: u64,
    /// Results discarded because nobody drained the result queue in time.
    pub dropped_results: u64,
    /// Exponential moving average of send duration in milliseconds.
    pub avg_duration_ms: f64,
    /// Percentage of processed requests that succeeded.
    pub success_rate: f64,
    pub workers: usize,
    /// Requests waiting for a worker.
    pub queue_size: usize,
    /// Results waiting for a reader.
    pub results_size: usize,
}
