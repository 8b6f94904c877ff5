//! Inbound request adaptation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Enforce the inbound body size limit
//! - Turn an inbound request into a canonical [`ForwardRequest`]
//!
//! # Design Decisions
//! - Headers are copied as received, duplicates included
//! - The query string travels inside the target URL
//! - Adapter failures carry their own status code and never reach the dispatcher

use axum::body::Body;
use axum::http::{HeaderName, Request, StatusCode};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Map, Value};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::config::{BodyMode, ProxyConfig};
use crate::forward::{ForwardBody, ForwardMethod, ForwardRequest, UnsupportedMethod};

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Read the request ID set by the request-id layer, if any.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Why an inbound request could not be turned into a [`ForwardRequest`].
#[derive(Debug, Error)]
pub enum InboundError {
    #[error(transparent)]
    UnsupportedMethod(#[from] UnsupportedMethod),

    #[error("Request body exceeds the limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Request body is not a valid JSON object: {0}")]
    InvalidBody(String),

    #[error("Failed to read request body: {0}")]
    Read(String),

    #[error("Invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },
}

impl InboundError {
    /// Status code reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            InboundError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            InboundError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            InboundError::InvalidBody(_) | InboundError::Read(_) | InboundError::InvalidTarget { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Build the outbound call for an inbound request.
pub async fn build_forward_request(request: Request<Body>, proxy: &ProxyConfig) -> Result<ForwardRequest, InboundError> {
    let (parts, body) = request.into_parts();

    let method = ForwardMethod::try_from(&parts.method)?;
    let target_url = target_url(&proxy.integration_host, parts.uri.path(), parts.uri.query())?;
    let bytes = read_body(body, proxy.max_body_size).await?;

    let body = match proxy.body_mode {
        BodyMode::Structured => ForwardBody::Structured(parse_object(&bytes)?),
        BodyMode::Raw => ForwardBody::Raw(bytes),
    };

    Ok(ForwardRequest::new(method, target_url, parts.headers, body))
}

fn target_url(integration_host: &str, path: &str, query: Option<&str>) -> Result<String, InboundError> {
    let mut target = format!("{}{}", integration_host.trim_end_matches('/'), path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    url::Url::parse(&target).map_err(|e| InboundError::InvalidTarget {
        url: target.clone(),
        reason: e.to_string(),
    })?;
    Ok(target)
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, InboundError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(InboundError::BodyTooLarge { limit }),
        Err(e) => Err(InboundError::Read(e.to_string())),
    }
}

fn parse_object(bytes: &Bytes) -> Result<Map<String, Value>, InboundError> {
    if bytes.is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_slice(bytes).map_err(|e| InboundError::InvalidBody(e.to_string()))
}
