//! Round-robin pool of RPC connections.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::rpc::{Connector, LedgerRpc};
use crate::blockchain::types::BlockchainError;

/// Errors surfaced by the connection pool.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was closed; no handles are handed out anymore.
    #[error("connection pool is closed")]
    Closed,

    /// A connection could not be established during construction.
    #[error("failed to create connection {index}: {source}")]
    Connect {
        index: usize,
        #[source]
        source: BlockchainError,
    },
}

pub type PoolResult<T> = Result<T, PoolError>;

struct PoolState<C> {
    connections: Vec<Arc<C>>,
    /// Always in `[0, connections.len())` while open.
    cursor: usize,
    closed: bool,
}

/// A fixed set of connections to one endpoint, handed out round-robin.
pub struct ConnectionPool<C> {
    state: Mutex<PoolState<C>>,
    size: usize,
    endpoint: String,
}

impl<C: LedgerRpc> ConnectionPool<C> {
    /// Open `size` connections to `endpoint`.
    ///
    /// A size of 0 is clamped to 1. If any connection fails, the ones already
    /// opened are closed before the error is returned.
    pub async fn connect<K>(connector: &K, endpoint: &str, size: usize) -> PoolResult<Self>
    where
        K: Connector<Connection = C>,
    {
        let size = size.max(1);
        let mut connections: Vec<Arc<C>> = Vec::with_capacity(size);

        for index in 0..size {
            match connector.connect(endpoint).await {
                Ok(conn) => connections.push(Arc::new(conn)),
                Err(source) => {
                    for conn in &connections {
                        conn.close();
                    }
                    tracing::warn!(
                        endpoint,
                        index,
                        error = %source,
                        "Connection pool setup failed"
                    );
                    return Err(PoolError::Connect { index, source });
                }
            }
        }

        tracing::info!(endpoint, size, "Connection pool ready");
        Ok(Self {
            state: Mutex::new(PoolState {
                connections,
                cursor: 0,
                closed: false,
            }),
            size,
            endpoint: endpoint.to_string(),
        })
    }

    /// Next connection in round-robin order.
    pub fn acquire(&self) -> PoolResult<Arc<C>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PoolError::Closed);
        }

        let conn = state.connections[state.cursor].clone();
        state.cursor = (state.cursor + 1) % state.connections.len();
        Ok(conn)
    }

    /// Number of connections the pool was built with.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Release every connection. Calling it again is a no-op.
    pub fn close(&self) {
        let connections = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.cursor = 0;
            std::mem::take(&mut state.connections)
        };

        for conn in &connections {
            conn.close();
        }
        tracing::info!(
            endpoint = %self.endpoint,
            released = connections.len(),
            "Connection pool closed"
        );
    }
}

impl<C> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("endpoint", &self.endpoint)
            .field("size", &self.size)
            .finish()
    }
}
