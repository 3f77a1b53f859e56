//! Batch pipeline driving a real transaction manager over the in-memory ledger.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use custom_tx_engine::config::BatchConfig;
use custom_tx_engine::{BatchProcessor, BatchRequest, EngineError};

mod common;
use common::{manager_on, recipient, MockChain, CHAIN_ID, TIMEOUT};

fn batch_config(workers: usize) -> BatchConfig {
    BatchConfig {
        workers,
        queue_size: 64,
        request_timeout_secs: 5,
        result_publish_timeout_ms: 1_000,
    }
}

#[tokio::test]
async fn test_concurrent_batch_gets_distinct_nonces_and_proves() {
    let chain = MockChain::new(CHAIN_ID);
    let manager = Arc::new(manager_on(&chain).await);
    let processor = BatchProcessor::new(manager.clone(), &batch_config(8));

    for i in 0..40 {
        let payload = format!("Batch transaction #{i}").into_bytes();
        let request = BatchRequest::new(recipient(), payload);
        processor.submit(request).unwrap();
    }

    let results = processor.collect_results(40, Duration::from_secs(10)).await;
    assert_eq!(results.len(), 40);
    assert!(results.iter().all(|r| r.is_success()));

    let nonces: BTreeSet<u64> = results
        .iter()
        .filter_map(|r| r.outcome.as_ref().ok().map(|tx| tx.nonce()))
        .collect();
    assert_eq!(nonces, (0..40).collect::<BTreeSet<u64>>());

    let block = chain.mine();
    assert_eq!(block.transaction_count(), 40);

    for result in &results {
        let tx_hash = result.tx_hash().unwrap();
        let proof = manager.generate_proof(tx_hash, TIMEOUT).await.unwrap();
        assert_eq!(proof.payload, result.request.payload);
        manager.verify_proof(&proof, TIMEOUT).await.unwrap();
    }

    processor.close().await;
    let stats = processor.metrics();
    assert_eq!(stats.queued, 40);
    assert_eq!(stats.processed, 40);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.success_rate, 100.0);
    assert_eq!(stats.workers, 8);
    assert_eq!(manager.metrics().tx_sent, 40);
    assert_eq!(manager.metrics().proofs_generated, 40);
}

#[tokio::test]
async fn test_node_rejections_surface_as_failed_results() {
    let chain = MockChain::new(CHAIN_ID);
    let manager = Arc::new(manager_on(&chain).await);
    let processor = BatchProcessor::new(manager.clone(), &batch_config(1));

    chain.fail_next_sends(5);
    for i in 0..20 {
        processor
            .submit(BatchRequest::new(recipient(), vec![i as u8]))
            .unwrap();
    }

    let results = processor.collect_results(20, Duration::from_secs(10)).await;
    assert_eq!(results.len(), 20);
    assert_eq!(results.iter().filter(|r| !r.is_success()).count(), 5);
    assert!(results
        .iter()
        .filter_map(|r| r.outcome.as_ref().err())
        .all(|e| matches!(e, EngineError::Blockchain(_))));

    // Rejected sends never consumed a nonce.
    let nonces: BTreeSet<u64> = results
        .iter()
        .filter_map(|r| r.outcome.as_ref().ok().map(|tx| tx.nonce()))
        .collect();
    assert_eq!(nonces, (0..15).collect::<BTreeSet<u64>>());

    let stats = processor.metrics();
    assert_eq!(stats.processed, 20);
    assert_eq!(stats.failed, 5);
    assert_eq!(stats.success_rate, 75.0);
    assert_eq!(manager.metrics().tx_failed, 5);
    processor.close().await;
}

#[tokio::test]
async fn test_close_drains_accepted_requests() {
    let chain = MockChain::new(CHAIN_ID);
    let manager = Arc::new(manager_on(&chain).await);
    let processor = BatchProcessor::new(manager, &batch_config(2));

    for i in 0..10u8 {
        processor.submit(BatchRequest::new(recipient(), vec![i])).unwrap();
    }
    processor.close().await;

    let mut drained = 0;
    while let Some(result) = processor.next_result().await {
        assert!(result.is_success());
        drained += 1;
    }
    assert_eq!(drained, 10);
    assert_eq!(chain.mempool_len(), 10);
    assert!(processor.submit(BatchRequest::new(recipient(), vec![0])).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_sends_recover_like_other_failures() {
    let chain = MockChain::new(CHAIN_ID);
    let manager = Arc::new(manager_on(&chain).await);
    let mut config = batch_config(4);
    config.request_timeout_secs = 1;
    let processor = BatchProcessor::new(manager.clone(), &config);

    chain.set_send_delay(Duration::from_secs(3));
    for i in 0..12u8 {
        processor.submit(BatchRequest::new(recipient(), vec![i])).unwrap();
    }

    let results = processor.collect_results(12, Duration::from_secs(60)).await;
    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|r| matches!(
        r.outcome,
        Err(EngineError::Timeout {
            operation: "send",
            ..
        })
    )));

    let stats = processor.metrics();
    assert_eq!(stats.failed, 12);
    assert_eq!(manager.metrics().tx_failed, stats.failed);
    assert_eq!(manager.nonces().get_cached(manager.address()).await, None);
    processor.close().await;
}
