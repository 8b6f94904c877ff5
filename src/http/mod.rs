//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → [routing decides forward vs. local answer]
//!     → request.rs (method, target URL, headers, body → ForwardRequest)
//!     → [resilience dispatcher delivers or rejects]
//!     → response.rs (verbatim relay or JSON error body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{build_forward_request, InboundError, MakeRequestUuid, X_REQUEST_ID};
pub use response::{error_response, relay, ErrorBody};
pub use server::GatewayServer;
