//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, window sizes, timeouts)
//! - Validate downstream URLs and path patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::{CircuitBreakerConfig, GatewayConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "proxy.host", &config.proxy.host);
    check_url(&mut errors, "proxy.integration_host", &config.proxy.integration_host);
    if !config.proxy.proxy_api.starts_with('/') {
        errors.push(ValidationError::new("proxy.proxy_api", "must start with '/'"));
    }
    if config.proxy.max_body_size == 0 {
        errors.push(ValidationError::new("proxy.max_body_size", "must be greater than 0"));
    }

    for pattern in config
        .forwarding
        .included_paths
        .iter()
        .chain(config.forwarding.excluded_paths.iter())
    {
        if !pattern.starts_with('/') {
            errors.push(ValidationError::new(
                "forwarding",
                format!("path pattern '{}' must start with '/'", pattern),
            ));
        }
    }

    if config.circuit_breaker.activate {
        check_breaker(&mut errors, &config.circuit_breaker);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_breaker(errors: &mut Vec<ValidationError>, cb: &CircuitBreakerConfig) {
    check_percentage(errors, "circuit_breaker.failure_rate_threshold", cb.failure_rate_threshold);
    check_percentage(errors, "circuit_breaker.slow_call_rate_threshold", cb.slow_call_rate_threshold);

    if cb.sliding_window_size == 0 {
        errors.push(ValidationError::new("circuit_breaker.sliding_window_size", "must be at least 1"));
    }
    if cb.minimum_number_of_calls == 0 {
        errors.push(ValidationError::new("circuit_breaker.minimum_number_of_calls", "must be at least 1"));
    }
    if cb.permitted_number_of_calls_in_half_open_state == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.permitted_number_of_calls_in_half_open_state",
            "must be at least 1",
        ));
    }
    if cb.retry.activate && cb.retry.max_attempts == 0 {
        errors.push(ValidationError::new("circuit_breaker.retry.max_attempts", "must be at least 1"));
    }
    if cb.time_limiter.activate && cb.time_limiter.overall_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.time_limiter.overall_timeout_ms",
            "must be greater than 0",
        ));
    }
}

fn check_percentage(errors: &mut Vec<ValidationError>, field: &'static str, value: f32) {
    if !(value > 0.0 && value <= 100.0) {
        errors.push(ValidationError::new(field, format!("{} is not in (0, 100]", value)));
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("'{}' must be an absolute http(s) URL, got scheme '{}'", value, url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("'{}': {}", value, e))),
    }
}
