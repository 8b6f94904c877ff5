//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → evaluated once at startup into the dispatch pipeline
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BodyMode, CircuitBreakerConfig, ForwardingConfig, GatewayConfig, HttpClientConfig,
    ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, RetryConfig, TimeLimiterConfig,
};
