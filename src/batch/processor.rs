//! Bounded worker pool over a [`TransactionSender`].

use alloy::primitives::U256;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::batch::types::{BatchError, BatchRequest, BatchResult, BatchStats, TransactionSender};
use crate::config::BatchConfig;
use crate::observability::metrics;
use crate::transaction::EngineError;

/// Queue capacity used when zero is requested.
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// Smoothing factor of the latency moving average.
const EMA_ALPHA: f64 = 0.1;

/// Extra time a sender gets past the request timeout before the worker
/// abandons it. Senders enforce the request timeout themselves.
pub const SEND_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct WorkerOptions {
    request_timeout: Duration,
    publish_timeout: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    queued: u64,
    rejected: u64,
    processed: u64,
    failed: u64,
    dropped_results: u64,
    avg_duration_ms: f64,
}

/// State shared between the processor handle and its workers.
#[derive(Debug, Default)]
struct Shared {
    counters: Mutex<Counters>,
    queue_depth: AtomicUsize,
    results_depth: AtomicUsize,
}

impl Shared {
    fn record_outcome(&self, success: bool, duration: Duration) {
        let sample = duration.as_secs_f64() * 1000.0;
        let mut c = self.counters.lock();
        c.processed += 1;
        if !success {
            c.failed += 1;
        }
        c.avg_duration_ms = if c.processed == 1 {
            sample
        } else {
            c.avg_duration_ms * (1.0 - EMA_ALPHA) + sample * EMA_ALPHA
        };
    }

    fn publish_depths(&self) {
        metrics::record_batch_depths(
            self.queue_depth.load(Ordering::Relaxed),
            self.results_depth.load(Ordering::Relaxed),
        );
    }
}

/// Drives a [`TransactionSender`] from a bounded queue with a fixed number
/// of workers.
///
/// Submission never waits: a full queue is reported as
/// [`BatchError::QueueFull`]. Each accepted request yields exactly one
/// [`BatchResult`] unless the result queue stays full past the publish
/// timeout, in which case the result is dropped and counted.
pub struct BatchProcessor<S> {
    sender: Arc<S>,
    requests: Mutex<Option<mpsc::Sender<BatchRequest>>>,
    results: tokio::sync::Mutex<mpsc::Receiver<BatchResult>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
    shared: Arc<Shared>,
    worker_count: usize,
    capacity: usize,
}

impl<S: TransactionSender> BatchProcessor<S> {
    /// Start the workers. Must be called inside a tokio runtime.
    ///
    /// Zero workers is clamped to one; a zero queue size uses
    /// [`DEFAULT_QUEUE_SIZE`] for both queues.
    pub fn new(sender: Arc<S>, config: &BatchConfig) -> Self {
        let worker_count = config.workers.max(1);
        let capacity = if config.queue_size == 0 {
            DEFAULT_QUEUE_SIZE
        } else {
            config.queue_size
        };
        let options = WorkerOptions {
            request_timeout: config.request_timeout(),
            publish_timeout: config.result_publish_timeout(),
        };

        let (request_tx, request_rx) = mpsc::channel(capacity);
        let (result_tx, result_rx) = mpsc::channel(capacity);
        let request_rx = Arc::new(tokio::sync::Mutex::new(request_rx));
        let shared = Arc::new(Shared::default());

        let workers = (0..worker_count)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    sender.clone(),
                    request_rx.clone(),
                    result_tx.clone(),
                    shared.clone(),
                    options,
                ))
            })
            .collect();

        tracing::info!(workers = worker_count, queue_size = capacity, "Batch processor started");

        Self {
            sender,
            requests: Mutex::new(Some(request_tx)),
            results: tokio::sync::Mutex::new(result_rx),
            workers: Mutex::new(workers),
            closed: AtomicBool::new(false),
            shared,
            worker_count,
            capacity,
        }
    }

    pub fn sender(&self) -> &Arc<S> {
        &self.sender
    }

    /// Queue a request without waiting. Returns its id.
    pub fn submit(&self, mut request: BatchRequest) -> Result<Uuid, BatchError> {
        if self.is_closed() {
            return Err(BatchError::Closed);
        }

        request.value.get_or_insert(U256::ZERO);
        request.submitted_at = Some(Instant::now());
        let id = request.id;

        let guard = self.requests.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(BatchError::Closed);
        };

        // Counted before the send so a fast worker never sees it underflow.
        self.shared.queue_depth.fetch_add(1, Ordering::AcqRel);
        match tx.try_send(request) {
            Ok(()) => {
                self.shared.counters.lock().queued += 1;
                metrics::record_batch_request("queued");
                self.shared.publish_depths();
                tracing::trace!(%id, "Batch request queued");
                Ok(id)
            }
            Err(e) => {
                self.shared.queue_depth.fetch_sub(1, Ordering::AcqRel);
                match e {
                    TrySendError::Full(_) => {
                        self.shared.counters.lock().rejected += 1;
                        metrics::record_batch_request("rejected");
                        Err(BatchError::QueueFull {
                            capacity: self.capacity,
                        })
                    }
                    TrySendError::Closed(_) => Err(BatchError::Closed),
                }
            }
        }
    }

    /// Wait for the next result.
    ///
    /// Returns `None` once the processor is closed and every result has been
    /// read.
    pub async fn next_result(&self) -> Option<BatchResult> {
        let result = self.results.lock().await.recv().await?;
        self.shared.results_depth.fetch_sub(1, Ordering::AcqRel);
        Some(result)
    }

    /// Collect up to `count` results, stopping early at `timeout` or shutdown.
    pub async fn collect_results(&self, count: usize, timeout: Duration) -> Vec<BatchResult> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut collected = Vec::with_capacity(count);

        while collected.len() < count {
            match tokio::time::timeout_at(deadline, self.next_result()).await {
                Ok(Some(result)) => collected.push(result),
                Ok(None) | Err(_) => break,
            }
        }
        collected
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting requests, let workers drain what was accepted, and
    /// wait for them to exit. Later calls return immediately.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Dropping the only request sender ends the workers' recv loop once
        // the queue is empty.
        self.requests.lock().take();

        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Batch worker panicked");
            }
        }

        let stats = self.metrics();
        tracing::info!(
            processed = stats.processed,
            failed = stats.failed,
            dropped_results = stats.dropped_results,
            "Batch processor closed"
        );
    }

    pub fn metrics(&self) -> BatchStats {
        let c = self.shared.counters.lock();
        let success_rate = if c.processed == 0 {
            0.0
        } else {
            (c.processed - c.failed) as f64 / c.processed as f64 * 100.0
        };

        BatchStats {
            queued: c.queued,
            rejected: c.rejected,
            processed: c.processed,
            failed: c.failed,
            dropped_results: c.dropped_results,
            avg_duration_ms: c.avg_duration_ms,
            success_rate,
            workers: self.worker_count,
            queue_size: self.shared.queue_depth.load(Ordering::Acquire),
            results_size: self.shared.results_depth.load(Ordering::Acquire),
        }
    }
}

async fn run_worker<S: TransactionSender>(
    id: usize,
    sender: Arc<S>,
    requests: Arc<tokio::sync::Mutex<mpsc::Receiver<BatchRequest>>>,
    results: mpsc::Sender<BatchResult>,
    shared: Arc<Shared>,
    options: WorkerOptions,
) {
    tracing::debug!(worker = id, "Batch worker started");

    loop {
        let next = requests.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };
        shared.queue_depth.fetch_sub(1, Ordering::AcqRel);

        let start = Instant::now();
        let send_request = request.to_send_request();
        let send = sender.send(&send_request, options.request_timeout);
        let backstop = options.request_timeout + SEND_GRACE;
        let outcome = match tokio::time::timeout(backstop, send).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    worker = id,
                    request_id = %request.id,
                    "Sender ignored its deadline"
                );
                Err(EngineError::Timeout {
                    operation: "batch request",
                    timeout: backstop,
                })
            }
        };
        let duration = start.elapsed();

        shared.record_outcome(outcome.is_ok(), duration);
        metrics::record_batch_request(if outcome.is_ok() { "succeeded" } else { "failed" });
        if let Err(e) = &outcome {
            tracing::debug!(
                worker = id,
                request_id = %request.id,
                error = %e,
                "Batch request failed"
            );
        }

        let request_id = request.id;
        let result = BatchResult {
            request,
            outcome,
            duration,
        };

        shared.results_depth.fetch_add(1, Ordering::AcqRel);
        match results.send_timeout(result, options.publish_timeout).await {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) | Err(SendTimeoutError::Closed(_)) => {
                shared.results_depth.fetch_sub(1, Ordering::AcqRel);
                shared.counters.lock().dropped_results += 1;
                metrics::record_batch_request("dropped");
                tracing::warn!(
                    worker = id,
                    %request_id,
                    "Result queue full, dropping batch result"
                );
            }
        }
        shared.publish_depths();
    }

    tracing::debug!(worker = id, "Batch worker stopped");
}
