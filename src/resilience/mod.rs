//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! ForwardRequest
//!     → dispatcher.rs (pipeline composed once from config)
//!     → timeouts.rs (optional: overall deadline over everything below)
//!     → retries.rs (optional: fixed-wait re-invocation)
//!     → circuit_breaker.rs (gate + outcome recording, per attempt)
//!     → OutboundSender
//! ```
//!
//! # Design Decisions
//! - The timeout bounds the whole retry sequence, not each attempt
//! - Every attempt re-enters the breaker; an open breaker ends the retry loop
//! - Downstream HTTP statuses are results, never failures

pub mod circuit_breaker;
pub mod dispatcher;
pub mod retries;
pub mod timeouts;

use std::time::Duration;

use thiserror::Error;

use crate::forward::{DownstreamResponse, TransportError};
use crate::resilience::circuit_breaker::CircuitState;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerSettings};
pub use dispatcher::{DispatchError, DispatchResult, Dispatcher, RejectionReason};
pub use retries::RetryPolicy;
pub use timeouts::TimeoutPolicy;

/// Why a guarded call did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("CircuitBreaker '{name}' is {state} and does not permit further calls")]
    CircuitOpen { name: String, state: CircuitState },

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    #[error("Call did not complete within {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Outcome of one (possibly retried) call.
pub type CallOutcome = Result<DownstreamResponse, CallError>;
