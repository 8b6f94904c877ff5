//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the integration gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Downstream proxy endpoint and inbound translation settings.
    pub proxy: ProxyConfig,

    /// Which inbound paths are forwarded.
    pub forwarding: ForwardingConfig,

    /// Transport timeouts used when the circuit breaker is disabled.
    pub http_client: HttpClientConfig,

    /// Fault-tolerant dispatch settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How the inbound body is carried inside the outbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyMode {
    /// Body is parsed as a JSON object; an empty body becomes `{}`.
    #[default]
    Structured,
    /// Body bytes are passed through untouched.
    Raw,
}

/// Downstream proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL of the proxy server receiving the envelope.
    pub host: String,

    /// Path on `host` the envelope is POSTed to.
    pub proxy_api: String,

    /// Base URL the inbound path and query are rewritten onto.
    pub integration_host: String,

    /// Body translation mode.
    pub body_mode: BodyMode,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl ProxyConfig {
    /// Full URL the envelope is sent to.
    pub fn proxy_url(&self) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), self.proxy_api)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:9000".to_string(),
            proxy_api: "/api/proxy".to_string(),
            integration_host: "http://127.0.0.1:9100".to_string(),
            body_mode: BodyMode::Structured,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Path patterns deciding which requests are forwarded.
///
/// Patterns are either literal paths or prefixes ending in `/**`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    pub included_paths: Vec<String>,
    pub excluded_paths: Vec<String>,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            included_paths: vec!["/**".to_string()],
            excluded_paths: Vec::new(),
        }
    }
}

/// Plain HTTP client timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Connection establishment timeout in milliseconds.
    pub default_connect_timeout_ms: u64,

    /// Read timeout in milliseconds.
    pub default_read_timeout_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            default_connect_timeout_ms: 5_000,
            default_read_timeout_ms: 30_000,
        }
    }
}

/// Circuit breaker configuration, with retry and time limiter nested under it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Enable the fault-tolerant dispatch path.
    pub activate: bool,

    /// Failure rate (percent) at which the breaker opens.
    pub failure_rate_threshold: f32,

    /// Calls required in the window before rates are evaluated.
    pub minimum_number_of_calls: u32,

    /// Capacity of the count-based sliding window.
    pub sliding_window_size: u32,

    /// Time the breaker stays open before probing, in milliseconds.
    pub wait_duration_in_open_state_ms: u64,

    /// Latency at or above which a call counts as slow, in milliseconds.
    pub slow_call_duration_threshold_ms: u64,

    /// Slow-call rate (percent) at which the breaker opens.
    pub slow_call_rate_threshold: f32,

    /// Let an expired open state report half-open without waiting for a call.
    pub automatic_transition_from_open_to_half_open_enabled: bool,

    /// Trial budget while half-open.
    pub permitted_number_of_calls_in_half_open_state: u32,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds.
    pub read_timeout_ms: u64,

    pub retry: RetryConfig,

    pub time_limiter: TimeLimiterConfig,
}

impl CircuitBreakerConfig {
    pub fn wait_duration_in_open_state(&self) -> Duration {
        Duration::from_millis(self.wait_duration_in_open_state_ms)
    }

    pub fn slow_call_duration_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_call_duration_threshold_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            activate: false,
            failure_rate_threshold: 50.0,
            minimum_number_of_calls: 10,
            sliding_window_size: 20,
            wait_duration_in_open_state_ms: 10_000,
            slow_call_duration_threshold_ms: 5_000,
            slow_call_rate_threshold: 100.0,
            automatic_transition_from_open_to_half_open_enabled: true,
            permitted_number_of_calls_in_half_open_state: 3,
            connect_timeout_ms: 3_000,
            read_timeout_ms: 10_000,
            retry: RetryConfig::default(),
            time_limiter: TimeLimiterConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub activate: bool,

    /// Total number of attempts, the first call included.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub wait_duration_ms: u64,
}

impl RetryConfig {
    pub fn wait_duration(&self) -> Duration {
        Duration::from_millis(self.wait_duration_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            activate: false,
            max_attempts: 3,
            wait_duration_ms: 500,
        }
    }
}

/// Overall deadline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeLimiterConfig {
    /// Enable the overall deadline.
    pub activate: bool,

    /// Deadline for the whole (possibly retrying) call in milliseconds.
    pub overall_timeout_ms: u64,

    /// Signal cancellation to the in-flight call when the deadline passes.
    pub cancel_running_future: bool,
}

impl TimeLimiterConfig {
    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }
}

impl Default for TimeLimiterConfig {
    fn default() -> Self {
        Self {
            activate: false,
            overall_timeout_ms: 15_000,
            cancel_running_future: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
