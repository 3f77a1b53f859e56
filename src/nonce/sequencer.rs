//! Per-sender nonce sequencing.

use alloy::primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::blockchain::rpc::LedgerRpc;
use crate::blockchain::types::BlockchainError;
use crate::pool::{ConnectionPool, PoolError};

/// Default bound on the pending-nonce fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NonceError {
    #[error("failed to get pending nonce: {0}")]
    Fetch(#[from] BlockchainError),

    #[error("failed to get pending nonce: {0}")]
    Pool(#[from] PoolError),

    #[error("pending nonce fetch timed out after {0:?}")]
    Timeout(Duration),
}

pub type NonceResult<T> = Result<T, NonceError>;

/// Source of truth for an address's next nonce.
#[async_trait]
pub trait NonceSource: Send + Sync + 'static {
    async fn pending_nonce(&self, address: Address) -> NonceResult<u64>;
}

#[async_trait]
impl<C: LedgerRpc> NonceSource for ConnectionPool<C> {
    async fn pending_nonce(&self, address: Address) -> NonceResult<u64> {
        let conn = self.acquire()?;
        Ok(conn.pending_nonce(address).await?)
    }
}

/// Cached slot for one address. `None` means "ask the source next time".
type Slot = Arc<Mutex<Option<u64>>>;

/// Hands out gap-free nonces per address, seeded lazily from a [`NonceSource`].
///
/// Assignment for one address is serialized by that address's slot lock,
/// which is also held across the seeding fetch. Different addresses never
/// contend.
pub struct NonceSequencer<S> {
    source: Arc<S>,
    slots: DashMap<Address, Slot>,
    fetch_timeout: Duration,
}

impl<S: NonceSource> NonceSequencer<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_timeout(source, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<S>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            slots: DashMap::new(),
            fetch_timeout,
        }
    }

    fn slot(&self, address: Address) -> Slot {
        self.slots.entry(address).or_default().clone()
    }

    /// Next unused nonce for `address`.
    ///
    /// A fetch failure leaves the cache untouched.
    pub async fn next(&self, address: Address) -> NonceResult<u64> {
        let slot = self.slot(address);
        let mut cached = slot.lock().await;

        if let Some(nonce) = *cached {
            *cached = Some(nonce + 1);
            return Ok(nonce);
        }

        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.pending_nonce(address))
            .await
            .map_err(|_| NonceError::Timeout(self.fetch_timeout))??;

        tracing::debug!(%address, nonce = fetched, "Seeded nonce from node");
        *cached = Some(fetched + 1);
        Ok(fetched)
    }

    /// Forget the cached value so the next call re-queries the node.
    pub async fn reset(&self, address: Address) {
        let slot = self.slot(address);
        *slot.lock().await = None;
        tracing::debug!(%address, "Nonce cache reset");
    }

    /// The value the next call would return without fetching, if cached.
    pub async fn get_cached(&self, address: Address) -> Option<u64> {
        let slot = self.slots.get(&address).map(|r| r.value().clone())?;
        let cached = *slot.lock().await;
        cached
    }

    /// Drop every cached nonce.
    pub async fn reset_all(&self) {
        let slots: Vec<Slot> = self.slots.iter().map(|r| r.value().clone()).collect();
        for slot in slots {
            *slot.lock().await = None;
        }
    }
}
