//! Fault-tolerant dispatcher.
//!
//! Composes the breaker gate, the retry loop and the overall deadline around a
//! call to the [`OutboundSender`]. The pipeline shape is fixed when the
//! dispatcher is built:
//!
//! ```text
//! timeout? ( retry? ( breaker ( sender ) ) )
//! ```
//!
//! With the breaker disabled the sender is called directly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::CircuitBreakerConfig;
use crate::forward::{DownstreamResponse, ForwardRequest, OutboundSender};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{Admission, CircuitBreaker, CircuitBreakerSettings, OutcomeKind};
use crate::resilience::{CallError, CallOutcome, RetryPolicy, TimeoutPolicy};

/// Name of the single breaker guarding the integration endpoint.
pub const DEFAULT_BREAKER_NAME: &str = "integration-endpoint";

/// Category of a failed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    CircuitOpen,
    RetriesExhausted,
    TimedOut,
    TransportError,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::CircuitOpen => "circuit_open",
            RejectionReason::RetriesExhausted => "retries_exhausted",
            RejectionReason::TimedOut => "timed_out",
            RejectionReason::TransportError => "transport_error",
        }
    }
}

/// Uniform error for every failed dispatch, carrying the original message and cause.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DispatchError {
    reason: RejectionReason,
    message: String,
    #[source]
    cause: CallError,
}

impl DispatchError {
    pub fn reason(&self) -> RejectionReason {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &CallError {
        &self.cause
    }
}

impl From<CallError> for DispatchError {
    fn from(cause: CallError) -> Self {
        let reason = match &cause {
            CallError::CircuitOpen { .. } => RejectionReason::CircuitOpen,
            CallError::RetriesExhausted { .. } => RejectionReason::RetriesExhausted,
            CallError::TimedOut(_) => RejectionReason::TimedOut,
            CallError::Transport(_) => RejectionReason::TransportError,
        };
        Self {
            reason,
            message: cause.to_string(),
            cause,
        }
    }
}

/// What the response relay receives.
#[derive(Debug)]
pub enum DispatchResult {
    Delivered(DownstreamResponse),
    Rejected(DispatchError),
}

/// Composed forwarding pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    sender: Arc<dyn OutboundSender>,
    breaker: Option<Arc<CircuitBreaker>>,
    retry: Option<RetryPolicy>,
    timeout: Option<TimeoutPolicy>,
}

impl Dispatcher {
    /// Sender only, no fault tolerance.
    pub fn passthrough(sender: Arc<dyn OutboundSender>) -> Self {
        Self {
            sender,
            breaker: None,
            retry: None,
            timeout: None,
        }
    }

    /// Build the pipeline the configuration asks for.
    pub fn from_config(config: &CircuitBreakerConfig, sender: Arc<dyn OutboundSender>) -> Self {
        if !config.activate {
            tracing::debug!("Circuit breaker disabled, dispatching without fault tolerance");
            return Self::passthrough(sender);
        }

        let breaker = CircuitBreaker::new(DEFAULT_BREAKER_NAME, CircuitBreakerSettings::from(config));
        let mut dispatcher = Self::passthrough(sender).with_breaker(Arc::new(breaker));

        if config.retry.activate {
            dispatcher = dispatcher.with_retry(RetryPolicy::from_config(&config.retry));
        }
        if config.time_limiter.activate {
            dispatcher = dispatcher.with_timeout(TimeoutPolicy::from_config(&config.time_limiter));
        }
        dispatcher
    }

    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        tracing::debug!(breaker = %breaker.name(), "Supplier wrapped with circuit breaker");
        self.breaker = Some(breaker);
        self
    }

    /// Retry only takes effect together with a breaker.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        tracing::debug!(max_attempts = retry.max_attempts(), "Supplier wrapped with retry");
        self.retry = Some(retry);
        self
    }

    /// The deadline only takes effect together with a breaker.
    pub fn with_timeout(mut self, timeout: TimeoutPolicy) -> Self {
        tracing::debug!(timeout_ms = timeout.timeout().as_millis() as u64, "Supplier wrapped with time limiter");
        self.timeout = Some(timeout);
        self
    }

    pub fn breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.breaker.as_ref()
    }

    /// Deliver one request through the pipeline.
    pub async fn dispatch(&self, request: ForwardRequest) -> DispatchResult {
        let start = Instant::now();
        tracing::info!(
            method = %request.method(),
            target_url = %request.target_url(),
            "Intercepted request"
        );

        match self.execute(Arc::new(request)).await {
            Ok(response) => {
                tracing::debug!(status = %response.status, "Call completed successfully");
                metrics::record_dispatch("delivered", start);
                DispatchResult::Delivered(response)
            }
            Err(cause) => {
                let error = DispatchError::from(cause);
                tracing::error!(
                    reason = error.reason().as_str(),
                    error = %error,
                    "Request failed"
                );
                metrics::record_dispatch(error.reason().as_str(), start);
                DispatchResult::Rejected(error)
            }
        }
    }

    async fn execute(&self, request: Arc<ForwardRequest>) -> CallOutcome {
        let Some(breaker) = &self.breaker else {
            return self
                .sender
                .send(&request, &CancellationToken::new())
                .await
                .map_err(CallError::from);
        };

        let guarded = GuardedCall {
            sender: self.sender.clone(),
            breaker: breaker.clone(),
            retry: self.retry.clone(),
            request,
        };

        match &self.timeout {
            Some(timeout) => {
                timeout
                    .execute_with_timeout(move |cancel| async move { guarded.run(&cancel).await })
                    .await
            }
            None => guarded.run(&CancellationToken::new()).await,
        }
    }
}

/// Breaker-guarded call, optionally retried. Owns everything it needs so it
/// can run on a detached task.
struct GuardedCall {
    sender: Arc<dyn OutboundSender>,
    breaker: Arc<CircuitBreaker>,
    retry: Option<RetryPolicy>,
    request: Arc<ForwardRequest>,
}

impl GuardedCall {
    async fn run(&self, cancel: &CancellationToken) -> CallOutcome {
        match &self.retry {
            Some(retry) => retry.execute(cancel, |attempt| self.attempt(attempt, cancel)).await,
            None => self.attempt(1, cancel).await,
        }
    }

    async fn attempt(&self, attempt: u32, cancel: &CancellationToken) -> CallOutcome {
        let permit = match self.breaker.try_acquire() {
            Admission::Permitted(permit) => permit,
            Admission::Rejected(state) => {
                return Err(CallError::CircuitOpen {
                    name: self.breaker.name().to_string(),
                    state,
                })
            }
        };

        tracing::debug!(
            attempt,
            target_url = %self.request.target_url(),
            "Executing actual HTTP call"
        );
        let started = Instant::now();
        let result = self.sender.send(&self.request, cancel).await;
        let elapsed: Duration = started.elapsed();

        match &result {
            Ok(response) => {
                tracing::debug!(attempt, status = %response.status, "Received downstream response");
                self.breaker.on_outcome(permit, OutcomeKind::Success, elapsed);
            }
            Err(error) => {
                tracing::error!(attempt, error = %error, "Downstream call failed");
                self.breaker.on_outcome(permit, OutcomeKind::Failure, elapsed);
            }
        }

        result.map_err(CallError::from)
    }
}
