//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the transaction engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Node endpoint and connection settings.
    pub rpc: RpcConfig,

    /// Transaction construction settings.
    pub transaction: TransactionConfig,

    /// Proof, block and receipt cache settings.
    pub cache: CacheConfig,

    /// Batch pipeline settings.
    pub batch: BatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,

    /// Number of pooled connections.
    pub pool_size: usize,

    /// Per-call RPC timeout in seconds.
    pub timeout_secs: u64,

    /// Timeout for the pending-nonce lookup in seconds.
    pub nonce_timeout_secs: u64,

    /// Expected chain ID. Startup fails if the node reports another one.
    pub chain_id: Option<u64>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8545".to_string(),
            pool_size: 10,
            timeout_secs: 30,
            nonce_timeout_secs: 10,
            chain_id: None,
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn nonce_timeout(&self) -> Duration {
        Duration::from_secs(self.nonce_timeout_secs)
    }
}

/// Transaction construction configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TransactionConfig {
    /// Gas limit applied to every custom transaction.
    pub gas_limit: u64,

    /// Maximum fee per gas in gwei (protection against spikes).
    pub max_fee_per_gas_gwei: Option<u64>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            gas_limit: 100_000,
            max_fee_per_gas_gwei: None,
        }
    }
}

impl TransactionConfig {
    /// Fee ceiling in wei, if configured.
    pub fn max_fee_per_gas_wei(&self) -> Option<u128> {
        self.max_fee_per_gas_gwei
            .map(|gwei| u128::from(gwei) * 1_000_000_000)
    }
}

/// Cache tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a cached proof in seconds.
    pub proof_ttl_secs: u64,

    /// Interval between sweeps of expired proofs in seconds.
    pub sweep_interval_secs: u64,

    /// Maximum number of cached blocks.
    pub block_capacity: usize,

    /// Maximum number of cached receipts.
    pub receipt_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            proof_ttl_secs: 30 * 60,
            sweep_interval_secs: 5 * 60,
            block_capacity: 100,
            receipt_capacity: 1000,
        }
    }
}

impl CacheConfig {
    pub fn proof_ttl(&self) -> Duration {
        Duration::from_secs(self.proof_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Batch pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of concurrent workers.
    pub workers: usize,

    /// Capacity of the request and result queues.
    pub queue_size: usize,

    /// Timeout applied to each request in seconds.
    pub request_timeout_secs: u64,

    /// How long a worker waits for room in the result queue, in milliseconds.
    pub result_publish_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_size: 100,
            request_timeout_secs: 30,
            result_publish_timeout_ms: 1000,
        }
    }
}

impl BatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn result_publish_timeout(&self) -> Duration {
        Duration::from_millis(self.result_publish_timeout_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
