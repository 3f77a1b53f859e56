//! Transaction orchestration: send, prove, verify.
//!
//! # Data Flow
//! ```text
//! send(request)
//!     → NonceSequencer::next(wallet address)
//!     → pooled connection: priority fee + latest base fee
//!     → fee cap = tip + 2 × base fee (optional ceiling)
//!     → codec::build_custom_transaction → Wallet::sign_transaction
//!     → send_transaction
//!     failure at any step → nonce reset, tx_failed += 1
//!
//! generate_proof(tx hash)
//!     → proof cache ─ hit ─→ return
//!     → receipt (cache / RPC) → transaction by hash → block (cache / RPC)
//!     → memoized MerkleTree → sibling path → payload extraction
//!     → proof cache
//!
//! verify_proof(proof)
//!     → block (cache / RPC) → index / hash / receipt / root / payload checks
//! ```

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::blockchain::rpc::{Connector, LedgerRpc};
use crate::blockchain::types::{BlockchainError, LedgerBlock, SignedTransaction, TxReceipt};
use crate::blockchain::wallet::Wallet;
use crate::cache::{RecencyCache, TtlCache};
use crate::config::EngineConfig;
use crate::merkle::MerkleTree;
use crate::nonce::NonceSequencer;
use crate::observability::metrics;
use crate::pool::ConnectionPool;
use crate::transaction::codec;
use crate::transaction::error::{EngineError, EngineResult, VerificationError};
use crate::transaction::metrics::{ManagerMetrics, ManagerStats};
use crate::transaction::proof::Proof;

/// A transaction to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub to: Address,
    /// Wei to transfer; zero when `None`.
    pub value: Option<U256>,
    /// Application payload framed into the calldata.
    pub payload: Bytes,
    /// Ordinary calldata carried after the payload.
    pub data: Bytes,
}

impl SendRequest {
    pub fn new(to: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: None,
            payload: payload.into(),
            data: Bytes::new(),
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
}

/// Sends custom transactions and proves their inclusion.
pub struct TransactionManager<C: LedgerRpc> {
    wallet: Wallet,
    chain_id: u64,
    pool: Arc<ConnectionPool<C>>,
    nonces: NonceSequencer<ConnectionPool<C>>,
    proof_cache: TtlCache<TxHash, Arc<Proof>>,
    block_cache: RecencyCache<B256, LedgerBlock>,
    receipt_cache: RecencyCache<TxHash, TxReceipt>,
    trees: DashMap<B256, Arc<MerkleTree>>,
    metrics: ManagerMetrics,
    gas_limit: u64,
    max_fee_per_gas: Option<u128>,
}

fn block_matches_key(key: &B256, block: &LedgerBlock) -> bool {
    block.hash == *key
}

fn receipt_matches_key(key: &TxHash, receipt: &TxReceipt) -> bool {
    receipt.transaction_hash == *key
}

/// Await `fut`, mapping an elapsed deadline to [`EngineError::Timeout`].
async fn within<T, E, F>(operation: &'static str, timeout: Duration, fut: F) -> EngineResult<T>
where
    F: Future<Output = Result<T, E>>,
    EngineError: From<E>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(EngineError::Timeout { operation, timeout }),
    }
}

impl<C: LedgerRpc> TransactionManager<C> {
    /// Open the connection pool, learn the chain id and build the caches.
    ///
    /// Fails if any connection cannot be opened, or if `rpc.chain_id` is set
    /// and the node reports another chain.
    pub async fn connect<K>(
        connector: &K,
        config: &EngineConfig,
        wallet: Wallet,
    ) -> EngineResult<Self>
    where
        K: Connector<Connection = C>,
    {
        let pool = Arc::new(
            ConnectionPool::connect(connector, &config.rpc.url, config.rpc.pool_size).await?,
        );

        let chain_id = match Self::fetch_chain_id(&pool, config).await {
            Ok(id) => id,
            Err(e) => {
                pool.close();
                return Err(e);
            }
        };

        let nonces = NonceSequencer::with_timeout(pool.clone(), config.rpc.nonce_timeout());
        let proof_cache =
            TtlCache::with_sweep_interval(config.cache.proof_ttl(), config.cache.sweep_interval());

        tracing::info!(
            address = %wallet.address(),
            chain_id,
            endpoint = %config.rpc.url,
            pool_size = pool.size(),
            "Transaction manager ready"
        );

        Ok(Self {
            wallet,
            chain_id,
            pool,
            nonces,
            proof_cache,
            block_cache: RecencyCache::with_validator(
                config.cache.block_capacity,
                block_matches_key,
            ),
            receipt_cache: RecencyCache::with_validator(
                config.cache.receipt_capacity,
                receipt_matches_key,
            ),
            trees: DashMap::new(),
            metrics: ManagerMetrics::default(),
            gas_limit: config.transaction.gas_limit,
            max_fee_per_gas: config.transaction.max_fee_per_gas_wei(),
        })
    }

    async fn fetch_chain_id(pool: &ConnectionPool<C>, config: &EngineConfig) -> EngineResult<u64> {
        let conn = pool.acquire()?;
        let actual = within("chain_id", config.rpc.timeout(), conn.chain_id()).await?;

        match config.rpc.chain_id {
            Some(expected) if expected != actual => {
                Err(BlockchainError::ChainMismatch { expected, actual }.into())
            }
            _ => Ok(actual),
        }
    }

    /// Address transactions are sent from.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Chain id every transaction is signed for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    pub fn nonces(&self) -> &NonceSequencer<ConnectionPool<C>> {
        &self.nonces
    }

    pub fn metrics(&self) -> ManagerStats {
        self.metrics.snapshot()
    }

    /// Number of memoized block trees.
    pub fn cached_trees(&self) -> usize {
        self.trees.len()
    }

    /// Build, sign and submit a custom transaction.
    ///
    /// `timeout` bounds the whole operation. On any failure the sender's
    /// cached nonce is dropped so the next send re-reads it from the node.
    pub async fn send(
        &self,
        request: &SendRequest,
        timeout: Duration,
    ) -> EngineResult<SignedTransaction> {
        let start = Instant::now();
        let outcome = within("send", timeout, self.send_inner(request)).await;

        match &outcome {
            Ok(tx) => {
                self.metrics.update(|s| s.tx_sent += 1);
                metrics::record_tx_sent(start);
                tracing::debug!(
                    tx_hash = %tx.hash(),
                    nonce = tx.nonce(),
                    to = %request.to,
                    payload_len = request.payload.len(),
                    "Transaction sent"
                );
            }
            Err(e) => {
                self.metrics.update(|s| s.tx_failed += 1);
                metrics::record_tx_failed(e.kind());
                self.nonces.reset(self.wallet.address()).await;
                tracing::warn!(to = %request.to, error = %e, "Transaction send failed");
            }
        }

        outcome
    }

    async fn send_inner(&self, request: &SendRequest) -> EngineResult<SignedTransaction> {
        let value = request.value.unwrap_or(U256::ZERO);
        let nonce = self.nonces.next(self.wallet.address()).await?;

        let conn = self.pool.acquire()?;
        let tip = conn.suggested_priority_fee().await?;
        let base_fee = conn
            .latest_base_fee()
            .await?
            .ok_or(EngineError::MissingBaseFee)?;

        let fee_cap = tip.saturating_add(u128::from(base_fee).saturating_mul(2));
        if let Some(max) = self.max_fee_per_gas {
            if fee_cap > max {
                return Err(EngineError::FeeTooHigh { fee_cap, max });
            }
        }

        let unsigned = codec::build_custom_transaction(
            self.chain_id,
            nonce,
            Some(request.to),
            value,
            self.gas_limit,
            tip,
            fee_cap,
            &request.data,
            &request.payload,
        )?;
        let signed = self.wallet.sign_transaction(unsigned)?;

        let accepted = conn.send_transaction(&signed).await?;
        if accepted != signed.hash() {
            tracing::warn!(
                local = %signed.hash(),
                node = %accepted,
                "Node reported a different transaction hash"
            );
        }

        Ok(signed)
    }

    /// Poll until the receipt for `tx_hash` shows it mined, or `timeout` elapses.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
        poll_interval: Duration,
    ) -> EngineResult<TxReceipt> {
        within(
            "wait_for_receipt",
            timeout,
            self.poll_receipt(tx_hash, poll_interval),
        )
        .await
    }

    async fn poll_receipt(
        &self,
        tx_hash: TxHash,
        poll_interval: Duration,
    ) -> EngineResult<TxReceipt> {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            let conn = self.pool.acquire()?;
            match conn.transaction_receipt(tx_hash).await? {
                Some(receipt) if receipt.block_hash.is_some() => {
                    self.receipt_cache.set(tx_hash, receipt.clone());
                    return Ok(receipt);
                }
                _ => tracing::debug!(%tx_hash, "Transaction pending"),
            }
        }
    }

    /// Inclusion proof for a mined transaction.
    ///
    /// Served from the proof cache when possible.
    pub async fn generate_proof(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> EngineResult<Arc<Proof>> {
        if let Some(proof) = self.proof_cache.get(&tx_hash) {
            self.metrics.update(|s| s.cache_hits += 1);
            metrics::record_proof_cache(true);
            return Ok(proof);
        }
        self.metrics.update(|s| s.cache_misses += 1);
        metrics::record_proof_cache(false);

        let proof = Arc::new(within("generate_proof", timeout, self.build_proof(tx_hash)).await?);
        self.proof_cache.set(tx_hash, proof.clone());
        self.metrics.update(|s| s.proofs_generated += 1);
        metrics::record_proof_generated();

        tracing::debug!(
            %tx_hash,
            block_number = proof.block_number,
            index = proof.transaction_index,
            path_len = proof.proof_path.len(),
            "Proof generated"
        );
        Ok(proof)
    }

    async fn build_proof(&self, tx_hash: TxHash) -> EngineResult<Proof> {
        let receipt = self.receipt(tx_hash).await?;
        let (Some(block_hash), Some(index)) = (receipt.block_hash, receipt.transaction_index) else {
            return Err(EngineError::TransactionPending(tx_hash));
        };

        let conn = self.pool.acquire()?;
        let fetched = conn
            .transaction_by_hash(tx_hash)
            .await?
            .ok_or(EngineError::TransactionNotFound(tx_hash))?;
        if fetched.pending {
            return Err(EngineError::TransactionPending(tx_hash));
        }

        let block = self.block(block_hash).await?;
        let tree = self.tree_for(&block);

        let position = usize::try_from(index).unwrap_or(usize::MAX);
        if tree.leaf(position) != Some(tx_hash) {
            return Err(EngineError::InconsistentBlock { block_hash, index });
        }
        let proof_path = tree.generate_proof(position)?;

        let payload = codec::decode(fetched.transaction.input())?.payload_or_empty();

        Ok(Proof {
            payload: Bytes::copy_from_slice(payload),
            block_number: receipt.block_number.unwrap_or(block.number),
            block_hash,
            transaction_index: index,
            receipt,
            transaction: fetched.transaction,
            proof_path,
        })
    }

    /// Check a proof against the chain.
    ///
    /// Succeeds only if every check holds; the first failing check is
    /// reported as its own [`VerificationError`].
    pub async fn verify_proof(&self, proof: &Proof, timeout: Duration) -> EngineResult<()> {
        let outcome = within("verify_proof", timeout, self.check_proof(proof)).await;
        let label = match &outcome {
            Ok(()) => "valid",
            Err(EngineError::Verification(_)) => "invalid",
            Err(_) => "error",
        };
        metrics::record_verification(label);

        if let Err(e) = &outcome {
            tracing::warn!(tx_hash = %proof.transaction_hash(), error = %e, "Proof rejected");
        }
        outcome
    }

    async fn check_proof(&self, proof: &Proof) -> EngineResult<()> {
        let block = self.block(proof.block_hash).await?;

        let count = block.transaction_count();
        let index = usize::try_from(proof.transaction_index)
            .ok()
            .filter(|i| *i < count)
            .ok_or(VerificationError::IndexOutOfRange {
                index: proof.transaction_index,
                count,
            })?;

        let tx_hash = proof.transaction.hash();
        let in_block = block.transactions[index];
        if in_block != tx_hash {
            return Err(VerificationError::HashMismatch {
                in_block,
                in_proof: tx_hash,
            }
            .into());
        }

        if proof.receipt.transaction_hash != tx_hash {
            return Err(VerificationError::ReceiptMismatch {
                receipt: proof.receipt.transaction_hash,
                transaction: tx_hash,
            }
            .into());
        }

        let tree = self.tree_for(&block);
        if !tree.verify_proof(tx_hash, index, &proof.proof_path) {
            return Err(VerificationError::MerkleMismatch.into());
        }

        let embedded = codec::decode(proof.transaction.input())?.payload_or_empty();
        if embedded != proof.payload.as_ref() {
            return Err(VerificationError::PayloadMismatch.into());
        }

        Ok(())
    }

    /// Merkle tree over a block's transactions, memoized per block hash.
    pub async fn merkle_tree(
        &self,
        block_hash: B256,
        timeout: Duration,
    ) -> EngineResult<Arc<MerkleTree>> {
        if let Some(tree) = self.trees.get(&block_hash) {
            return Ok(tree.clone());
        }
        let block = within("merkle_tree", timeout, self.block(block_hash)).await?;
        Ok(self.tree_for(&block))
    }

    fn tree_for(&self, block: &LedgerBlock) -> Arc<MerkleTree> {
        self.trees
            .entry(block.hash)
            .or_insert_with(|| {
                tracing::debug!(
                    block_hash = %block.hash,
                    leaves = block.transaction_count(),
                    "Building merkle tree"
                );
                Arc::new(MerkleTree::new(block.transactions.clone()))
            })
            .clone()
    }

    async fn receipt(&self, tx_hash: TxHash) -> EngineResult<TxReceipt> {
        if let Some(receipt) = self.receipt_cache.get(&tx_hash) {
            return Ok(receipt);
        }

        let conn = self.pool.acquire()?;
        let receipt = conn
            .transaction_receipt(tx_hash)
            .await?
            .ok_or(EngineError::ReceiptNotFound(tx_hash))?;

        // Only mined receipts are final.
        if receipt.block_hash.is_some() {
            self.receipt_cache.set(tx_hash, receipt.clone());
        }
        Ok(receipt)
    }

    async fn block(&self, block_hash: B256) -> EngineResult<LedgerBlock> {
        if let Some(block) = self.block_cache.get(&block_hash) {
            return Ok(block);
        }

        let conn = self.pool.acquire()?;
        let block = conn
            .block_by_hash(block_hash)
            .await?
            .ok_or(EngineError::BlockNotFound(block_hash))?;

        self.block_cache.set(block_hash, block.clone());
        Ok(block)
    }

    /// Release pooled connections and stop the proof cache sweeper.
    pub fn close(&self) {
        self.proof_cache.close();
        self.pool.close();
        tracing::info!(address = %self.wallet.address(), "Transaction manager closed");
    }
}
