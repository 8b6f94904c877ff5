//! Response relay.
//!
//! # Responsibilities
//! - Relay a delivered downstream response verbatim (status, headers, body)
//! - Render every rejection as the uniform JSON error body
//!
//! # Design Decisions
//! - Downstream 4xx/5xx are relayed unchanged
//! - Every rejection reason maps to 500; the reason only shows in the message and logs

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::forward::DownstreamResponse;
use crate::resilience::DispatchResult;

/// JSON body returned for every locally generated error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub status: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_u16(),
            status: false,
            message: message.into(),
        }
    }
}

/// Render an error body with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody::new(status, message);
    let bytes = match serde_json::to_vec(&body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize error body");
            return status.into_response();
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Turn a dispatch result into the response sent to the caller.
pub fn relay(result: DispatchResult) -> Response {
    match result {
        DispatchResult::Delivered(downstream) => relay_downstream(downstream),
        DispatchResult::Rejected(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error.message()),
    }
}

fn relay_downstream(downstream: DownstreamResponse) -> Response {
    let DownstreamResponse { status, headers, body } = downstream;
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
