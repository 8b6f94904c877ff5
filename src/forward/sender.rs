//! Outbound sender.
//!
//! # Responsibilities
//! - Execute exactly one HTTP call per invocation
//! - Apply connect/read transport timeouts
//! - Observe the cancellation token handed down by the timeout policy
//!
//! # Design Decisions
//! - Trait seam so dispatch logic can be exercised without a network
//! - Downstream HTTP error statuses are responses, never errors
//! - Cancellation is cooperative: the call stops at its next await point

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::forward::{DownstreamResponse, ForwardRequest, ProxyEnvelope};

/// Failure raised while talking to the downstream proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("read timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_) | TransportError::Timeout(_) | TransportError::Io(_)
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Io(e.to_string())
        }
    }
}

/// Executes a single call against the downstream endpoint.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    async fn send(
        &self,
        request: &ForwardRequest,
        cancel: &CancellationToken,
    ) -> Result<DownstreamResponse, TransportError>;
}

/// `reqwest`-backed sender posting a [`ProxyEnvelope`] to the proxy endpoint.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    proxy_url: String,
}

impl HttpSender {
    pub fn new(
        proxy_url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()?;

        Ok(Self {
            client,
            proxy_url: proxy_url.into(),
        })
    }

    /// Build the sender with the timeouts that match the breaker toggle.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, TransportError> {
        let (connect_ms, read_ms) = if config.circuit_breaker.activate {
            (
                config.circuit_breaker.connect_timeout_ms,
                config.circuit_breaker.read_timeout_ms,
            )
        } else {
            (
                config.http_client.default_connect_timeout_ms,
                config.http_client.default_read_timeout_ms,
            )
        };

        Self::new(
            config.proxy.proxy_url(),
            Duration::from_millis(connect_ms),
            Duration::from_millis(read_ms),
        )
    }

    async fn execute(&self, request: &ForwardRequest) -> Result<DownstreamResponse, TransportError> {
        let envelope = ProxyEnvelope::from_request(request);
        let response = self.client.post(&self.proxy_url).json(&envelope).send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(status = %status, bytes = body.len(), "Downstream responded");
        Ok(DownstreamResponse { status, headers, body })
    }
}

#[async_trait]
impl OutboundSender for HttpSender {
    async fn send(
        &self,
        request: &ForwardRequest,
        cancel: &CancellationToken,
    ) -> Result<DownstreamResponse, TransportError> {
        tracing::debug!(
            proxy_url = %self.proxy_url,
            target_url = %request.target_url(),
            "Executing downstream call"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(target_url = %request.target_url(), "Downstream call cancelled");
                Err(TransportError::Cancelled)
            }
            result = self.execute(request) => result,
        }
    }
}
