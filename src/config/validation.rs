//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, capacities > 0)
//! - Validate endpoint and bind addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::EngineConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid RPC url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("sweep interval ({sweep_secs}s) must not exceed proof TTL ({ttl_secs}s)")]
    SweepExceedsTtl { sweep_secs: u64, ttl_secs: u64 },
}

/// Check every semantic constraint and report all violations.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut require_positive = |value: u64, field: &'static str| {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    };
    require_positive(config.rpc.pool_size as u64, "rpc.pool_size");
    require_positive(config.rpc.timeout_secs, "rpc.timeout_secs");
    require_positive(config.rpc.nonce_timeout_secs, "rpc.nonce_timeout_secs");
    require_positive(config.transaction.gas_limit, "transaction.gas_limit");
    require_positive(config.cache.proof_ttl_secs, "cache.proof_ttl_secs");
    require_positive(config.cache.sweep_interval_secs, "cache.sweep_interval_secs");
    require_positive(config.batch.workers as u64, "batch.workers");
    require_positive(config.batch.queue_size as u64, "batch.queue_size");
    require_positive(config.batch.request_timeout_secs, "batch.request_timeout_secs");

    match url::Url::parse(&config.rpc.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            url: config.rpc.url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            url: config.rpc.url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.cache.sweep_interval_secs > config.cache.proof_ttl_secs {
        errors.push(ValidationError::SweepExceedsTtl {
            sweep_secs: config.cache.sweep_interval_secs,
            ttl_secs: config.cache.proof_ttl_secs,
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
