//! Timeout enforcement.
//!
//! # Responsibilities
//! - Run the guarded call on its own task and bound its total duration
//! - Release the caller as soon as the deadline passes
//! - Signal cancellation to the still-running task when configured
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Cancellation is cooperative via `CancellationToken`; the task is detached, never aborted
//! - Late results are dropped with the detached task

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::TimeLimiterConfig;
use crate::forward::TransportError;
use crate::resilience::{CallError, CallOutcome};

#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    timeout: Duration,
    cancel_running: bool,
}

impl TimeoutPolicy {
    pub fn new(timeout: Duration, cancel_running: bool) -> Self {
        Self {
            timeout,
            cancel_running,
        }
    }

    pub fn from_config(config: &TimeLimiterConfig) -> Self {
        Self::new(config.overall_timeout(), config.cancel_running_future)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Spawn `call` and wait for it at most `timeout`.
    ///
    /// `call` receives the token it must observe to honour cancellation.
    pub async fn execute_with_timeout<F, Fut>(&self, call: F) -> CallOutcome
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = CallOutcome> + Send + 'static,
    {
        let token = CancellationToken::new();
        tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "Starting call with time limit");
        let mut handle = tokio::spawn(call(token.clone()));

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                tracing::error!(error = %join_error, "Guarded call task failed");
                Err(CallError::Transport(TransportError::Io(format!(
                    "guarded call task failed: {}",
                    join_error
                ))))
            }
            Err(_) => {
                if self.cancel_running {
                    token.cancel();
                }
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    cancelled = self.cancel_running,
                    "Call timed out"
                );
                Err(CallError::TimedOut(self.timeout))
            }
        }
    }
}
