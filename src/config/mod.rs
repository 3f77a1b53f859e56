//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → read once when the engine and pipeline are built
//!
//! TXENGINE_PRIVATE_KEY (environment)
//!     → blockchain::Wallet (never stored in the config)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BatchConfig, CacheConfig, EngineConfig, ObservabilityConfig, RpcConfig, TransactionConfig,
};
pub use validation::{validate_config, ValidationError};
