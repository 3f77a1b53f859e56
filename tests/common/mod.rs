//! Shared utilities for integration tests: an in-memory ledger that accepts
//! signed transactions, mines them into blocks on demand and serves them back
//! through [`LedgerRpc`].

#![allow(dead_code)]

use alloy::primitives::{keccak256, Address, TxHash, B256};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use custom_tx_engine::blockchain::{
    BlockchainError, BlockchainResult, Connector, FetchedTransaction, LedgerBlock, LedgerRpc,
    SignedTransaction, TxReceipt, Wallet,
};
use custom_tx_engine::config::EngineConfig;
use custom_tx_engine::TransactionManager;

pub const CHAIN_ID: u64 = 31337;
pub const GWEI: u64 = 1_000_000_000;

// Anvil's first account.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

struct Inclusion {
    block_hash: B256,
    block_number: u64,
    index: u64,
}

struct StoredTx {
    tx: SignedTransaction,
    inclusion: Option<Inclusion>,
}

#[derive(Default)]
struct ChainState {
    /// Account nonces the node already knows about.
    floors: HashMap<Address, u64>,
    used: HashMap<Address, BTreeSet<u64>>,
    mempool: Vec<TxHash>,
    transactions: HashMap<TxHash, StoredTx>,
    blocks: HashMap<B256, LedgerBlock>,
    height: u64,
    parent: B256,
}

/// In-memory chain with failure injection.
pub struct MockChain {
    chain_id: u64,
    state: Mutex<ChainState>,
    base_fee: Mutex<Option<u64>>,
    priority_fee: Mutex<u128>,
    send_delay: Mutex<Duration>,
    failing_sends: AtomicUsize,
    pub nonce_queries: AtomicUsize,
    pub block_queries: AtomicUsize,
    pub receipt_queries: AtomicUsize,
    pub closed_connections: AtomicUsize,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            state: Mutex::new(ChainState::default()),
            base_fee: Mutex::new(Some(10 * GWEI)),
            priority_fee: Mutex::new(u128::from(GWEI)),
            send_delay: Mutex::new(Duration::ZERO),
            failing_sends: AtomicUsize::new(0),
            nonce_queries: AtomicUsize::new(0),
            block_queries: AtomicUsize::new(0),
            receipt_queries: AtomicUsize::new(0),
            closed_connections: AtomicUsize::new(0),
        })
    }

    pub fn connector(self: &Arc<Self>) -> MockConnector {
        MockConnector {
            chain: self.clone(),
            fail_at: None,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn set_base_fee(&self, fee: Option<u64>) {
        *self.base_fee.lock() = fee;
    }

    pub fn set_priority_fee(&self, fee: u128) {
        *self.priority_fee.lock() = fee;
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock() = delay;
    }

    /// Reject the next `count` broadcasts.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    pub fn set_account_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().floors.insert(address, nonce);
    }

    pub fn mempool_len(&self) -> usize {
        self.state.lock().mempool.len()
    }

    /// Include every pending transaction, in arrival order, in a new block.
    pub fn mine(&self) -> LedgerBlock {
        let mut state = self.state.lock();
        let number = state.height + 1;
        let transactions = std::mem::take(&mut state.mempool);

        let mut preimage = Vec::with_capacity(40 + transactions.len() * 32);
        preimage.extend_from_slice(&number.to_be_bytes());
        preimage.extend_from_slice(state.parent.as_slice());
        for hash in &transactions {
            preimage.extend_from_slice(hash.as_slice());
        }
        let hash = keccak256(&preimage);

        for (index, tx_hash) in transactions.iter().enumerate() {
            if let Some(stored) = state.transactions.get_mut(tx_hash) {
                stored.inclusion = Some(Inclusion {
                    block_hash: hash,
                    block_number: number,
                    index: index as u64,
                });
            }
        }

        let block = LedgerBlock {
            hash,
            number,
            transactions,
        };
        state.blocks.insert(hash, block.clone());
        state.height = number;
        state.parent = hash;
        block
    }

    fn pending_nonce_for(&self, address: Address) -> u64 {
        let state = self.state.lock();
        let floor = state.floors.get(&address).copied().unwrap_or(0);
        let next_used = state
            .used
            .get(&address)
            .and_then(|set| set.last())
            .map_or(0, |last| last + 1);
        floor.max(next_used)
    }

    fn accept(&self, tx: &SignedTransaction) -> BlockchainResult<TxHash> {
        let remaining = self.failing_sends.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_sends.store(remaining - 1, Ordering::SeqCst);
            return Err(BlockchainError::Rpc("injected send failure".into()));
        }

        if tx.chain_id() != Some(self.chain_id) {
            return Err(BlockchainError::Rpc("invalid chain id".into()));
        }

        let sender = tx
            .envelope()
            .as_eip1559()
            .ok_or_else(|| BlockchainError::Rpc("unsupported transaction type".into()))?
            .recover_signer()
            .map_err(|e| BlockchainError::Rpc(e.to_string()))?;

        let mut state = self.state.lock();
        let floor = state.floors.get(&sender).copied().unwrap_or(0);
        let used = state.used.entry(sender).or_default();
        if tx.nonce() < floor || used.contains(&tx.nonce()) {
            return Err(BlockchainError::Rpc(format!("nonce too low: {}", tx.nonce())));
        }
        used.insert(tx.nonce());

        let hash = tx.hash();
        state.mempool.push(hash);
        state.transactions.insert(
            hash,
            StoredTx {
                tx: tx.clone(),
                inclusion: None,
            },
        );
        Ok(hash)
    }
}

/// One connection to a [`MockChain`].
pub struct MockConnection {
    chain: Arc<MockChain>,
}

#[async_trait]
impl LedgerRpc for MockConnection {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        Ok(self.chain.chain_id)
    }

    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.chain.nonce_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.chain.pending_nonce_for(address))
    }

    async fn suggested_priority_fee(&self) -> BlockchainResult<u128> {
        Ok(*self.chain.priority_fee.lock())
    }

    async fn latest_base_fee(&self) -> BlockchainResult<Option<u64>> {
        Ok(*self.chain.base_fee.lock())
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> BlockchainResult<TxHash> {
        let delay = *self.chain.send_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.chain.accept(tx)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<TxReceipt>> {
        self.chain.receipt_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.chain.state.lock();
        Ok(state.transactions.get(&tx_hash).and_then(|stored| {
            stored.inclusion.as_ref().map(|inc| TxReceipt {
                transaction_hash: tx_hash,
                block_hash: Some(inc.block_hash),
                block_number: Some(inc.block_number),
                transaction_index: Some(inc.index),
                status: true,
                gas_used: 21_000,
            })
        }))
    }

    async fn transaction_by_hash(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<FetchedTransaction>> {
        let state = self.chain.state.lock();
        Ok(state.transactions.get(&tx_hash).map(|stored| FetchedTransaction {
            transaction: stored.tx.clone(),
            pending: stored.inclusion.is_none(),
        }))
    }

    async fn block_by_hash(&self, block_hash: B256) -> BlockchainResult<Option<LedgerBlock>> {
        self.chain.block_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.chain.state.lock().blocks.get(&block_hash).cloned())
    }

    fn close(&self) {
        self.chain.closed_connections.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockConnector {
    chain: Arc<MockChain>,
    /// Fail the connection attempt with this zero-based index.
    pub fail_at: Option<usize>,
    pub connects: AtomicUsize,
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, endpoint: &str) -> BlockchainResult<MockConnection> {
        let index = self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(index) {
            return Err(BlockchainError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "injected connect failure".into(),
            });
        }
        Ok(MockConnection {
            chain: self.chain.clone(),
        })
    }
}

pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.rpc.url = "http://mock.invalid:8545".into();
    config.rpc.pool_size = 3;
    config
}

pub fn test_wallet() -> Wallet {
    Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap()
}

pub async fn manager_on(chain: &Arc<MockChain>) -> TransactionManager<MockConnection> {
    manager_with(chain, &test_config()).await
}

pub async fn manager_with(
    chain: &Arc<MockChain>,
    config: &EngineConfig,
) -> TransactionManager<MockConnection> {
    TransactionManager::connect(&chain.connector(), config, test_wallet())
        .await
        .unwrap()
}

pub fn recipient() -> Address {
    Address::repeat_byte(0x42)
}

pub const TIMEOUT: Duration = Duration::from_secs(5);
