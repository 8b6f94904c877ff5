//! Retry logic.
//!
//! # Responsibilities
//! - Re-invoke a failed call up to `max_attempts` times in total
//! - Wait a fixed duration between attempts
//! - Stop on success, on an open breaker, or on a non-retryable error
//!
//! # Design Decisions
//! - Connect, read-timeout and I/O failures are retryable; request
//!   construction errors and cancellations are not
//! - The wait is abandoned as soon as the call is cancelled

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::forward::TransportError;
use crate::observability::metrics;
use crate::resilience::{CallError, CallOutcome};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    wait_duration: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait_duration: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait_duration,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.wait_duration())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `call` until it succeeds or the policy gives up.
    ///
    /// `call` receives the 1-based attempt number.
    pub async fn execute<F, Fut>(&self, cancel: &CancellationToken, mut call: F) -> CallOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CallOutcome>,
    {
        let mut attempts_so_far = 0;

        loop {
            attempts_so_far += 1;

            let error = match call(attempts_so_far).await {
                Ok(response) => return Ok(response),
                Err(CallError::Transport(error)) if error.is_retryable() => error,
                Err(other) => return Err(other),
            };

            if attempts_so_far >= self.max_attempts {
                return Err(CallError::RetriesExhausted {
                    attempts: attempts_so_far,
                    last: error,
                });
            }

            tracing::warn!(
                attempt = attempts_so_far,
                max_attempts = self.max_attempts,
                delay = ?self.wait_duration,
                error = %error,
                "Retry attempt {}",
                attempts_so_far
            );
            metrics::record_retry_attempt();

            tokio::select! {
                _ = cancel.cancelled() => return Err(CallError::Transport(TransportError::Cancelled)),
                _ = tokio::time::sleep(self.wait_duration) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::DownstreamResponse;
    use crate::resilience::circuit_breaker::CircuitState;
    use axum::http::{HeaderMap, StatusCode};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn ok() -> CallOutcome {
        Ok(DownstreamResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"done"),
        })
    }

    fn connect_error() -> CallOutcome {
        Err(CallError::Transport(TransportError::Connect("refused".into())))
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let outcome = policy(4)
            .execute(&CancellationToken::new(), move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        connect_error()
                    } else {
                        ok()
                    }
                }
            })
            .await;

        assert!(outcome.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let outcome = policy(3)
            .execute(&CancellationToken::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { connect_error() }
            })
            .await;

        assert_eq!(
            outcome.unwrap_err(),
            CallError::RetriesExhausted {
                attempts: 3,
                last: TransportError::Connect("refused".into()),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_open_breaker_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let outcome = policy(5)
            .execute(&CancellationToken::new(), move |attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 1 {
                        connect_error()
                    } else {
                        Err(CallError::CircuitOpen {
                            name: "downstream".into(),
                            state: CircuitState::Open,
                        })
                    }
                }
            })
            .await;

        assert!(matches!(outcome, Err(CallError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returned_as_is() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let outcome = policy(5)
            .execute(&CancellationToken::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(CallError::Transport(TransportError::InvalidRequest("bad url".into()))) }
            })
            .await;

        assert!(matches!(
            outcome,
            Err(CallError::Transport(TransportError::InvalidRequest(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_wait() {
        let token = CancellationToken::new();
        token.cancel();
        let slow_policy = RetryPolicy::new(3, Duration::from_secs(30));

        let started = std::time::Instant::now();
        let outcome = slow_policy.execute(&token, |_| async { connect_error() }).await;

        assert_eq!(
            outcome.unwrap_err(),
            CallError::Transport(TransportError::Cancelled)
        );
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
