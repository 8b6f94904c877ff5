//! Canonical forwarding types and the outbound side of the gateway.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → http/request.rs builds a ForwardRequest
//!     → resilience/dispatcher.rs guards the call
//!     → sender.rs POSTs envelope.rs to the downstream proxy
//!     → DownstreamResponse relayed by http/response.rs
//! ```

pub mod envelope;
pub mod sender;

use std::fmt;
use std::str::FromStr;

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use serde_json::{Map, Value};

pub use envelope::ProxyEnvelope;
pub use sender::{HttpSender, OutboundSender, TransportError};

/// Methods the downstream integration endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl ForwardMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardMethod::Get => "GET",
            ForwardMethod::Post => "POST",
            ForwardMethod::Put => "PUT",
            ForwardMethod::Patch => "PATCH",
            ForwardMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ForwardMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a method is outside GET/POST/PUT/PATCH/DELETE.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid method '{0}'. Please use GET, POST, PUT, PATCH or DELETE")]
pub struct UnsupportedMethod(pub String);

impl FromStr for ForwardMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(ForwardMethod::Get),
            "POST" => Ok(ForwardMethod::Post),
            "PUT" => Ok(ForwardMethod::Put),
            "PATCH" => Ok(ForwardMethod::Patch),
            "DELETE" => Ok(ForwardMethod::Delete),
            other => Err(UnsupportedMethod(other.to_string())),
        }
    }
}

impl TryFrom<&Method> for ForwardMethod {
    type Error = UnsupportedMethod;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Body carried to the downstream endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardBody {
    /// Body interpreted as a JSON object.
    Structured(Map<String, Value>),
    /// Body bytes exactly as received.
    Raw(Bytes),
}

/// Canonical outbound call built from one inbound request.
///
/// Immutable once constructed; retries share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    method: ForwardMethod,
    target_url: String,
    headers: HeaderMap,
    body: ForwardBody,
}

impl ForwardRequest {
    pub fn new(method: ForwardMethod, target_url: impl Into<String>, headers: HeaderMap, body: ForwardBody) -> Self {
        Self {
            method,
            target_url: target_url.into(),
            headers,
            body,
        }
    }

    pub fn method(&self) -> ForwardMethod {
        self.method
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ForwardBody {
        &self.body
    }
}

/// Response received from the downstream proxy, relayed as-is.
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("PATCH".parse::<ForwardMethod>(), Ok(ForwardMethod::Patch));
        assert_eq!(ForwardMethod::try_from(&Method::DELETE), Ok(ForwardMethod::Delete));
        assert_eq!(
            ForwardMethod::try_from(&Method::OPTIONS),
            Err(UnsupportedMethod("OPTIONS".into()))
        );
        assert!("get".parse::<ForwardMethod>().is_err());
    }
}
