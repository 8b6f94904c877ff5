//! Forwarding decision.
//!
//! # Responsibilities
//! - Store compiled include/exclude patterns
//! - Decide whether a request goes downstream or is answered locally
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exclusion wins over inclusion
//! - O(n) pattern scan (acceptable for typical pattern counts)

use axum::body::Body;
use axum::http::Request;

use crate::config::ForwardingConfig;
use crate::routing::matcher::{Matcher, PathPattern};

/// Compiled forwarding rules.
#[derive(Debug, Clone)]
pub struct ForwardingRules {
    included: Vec<PathPattern>,
    excluded: Vec<PathPattern>,
}

impl ForwardingRules {
    /// Compile the rules from configuration.
    pub fn from_config(config: &ForwardingConfig) -> Self {
        let included: Vec<PathPattern> = config.included_paths.iter().map(|p| PathPattern::parse(p)).collect();
        let excluded: Vec<PathPattern> = config.excluded_paths.iter().map(|p| PathPattern::parse(p)).collect();

        tracing::debug!(
            included = included.len(),
            excluded = excluded.len(),
            "Forwarding rules compiled"
        );
        Self { included, excluded }
    }

    /// True when the request should be sent to the integration endpoint.
    pub fn should_forward(&self, req: &Request<Body>) -> bool {
        self.included.iter().any(|p| p.matches(req)) && !self.excluded.iter().any(|p| p.matches(req))
    }
}

impl Default for ForwardingRules {
    fn default() -> Self {
        Self::from_config(&ForwardingConfig::default())
    }
}
