//! Integration gateway library.
//!
//! Forwards every inbound HTTP request to a single downstream integration
//! endpoint through an optional circuit breaker, retry and timeout pipeline,
//! and relays the answer back to the caller.

pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
