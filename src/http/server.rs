//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (request ID, tracing)
//! - Decide per request: forward downstream or answer locally
//! - Adapt, dispatch and relay forwarded requests
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, ProxyConfig};
use crate::forward::{HttpSender, OutboundSender, TransportError};
use crate::http::request::{build_forward_request, request_id, MakeRequestUuid};
use crate::http::response::{error_response, relay};
use crate::observability::metrics;
use crate::resilience::Dispatcher;
use crate::routing::ForwardingRules;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub rules: Arc<ForwardingRules>,
    pub proxy: Arc<ProxyConfig>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a server that forwards through the `reqwest` sender.
    pub fn new(config: GatewayConfig) -> Result<Self, TransportError> {
        let sender = HttpSender::from_config(&config)?;
        Ok(Self::with_sender(config, Arc::new(sender)))
    }

    /// Create a server around any outbound sender.
    pub fn with_sender(config: GatewayConfig, sender: Arc<dyn OutboundSender>) -> Self {
        let dispatcher = Dispatcher::from_config(&config.circuit_breaker, sender);
        let state = AppState {
            dispatcher,
            rules: Arc::new(ForwardingRules::from_config(&config.forwarding)),
            proxy: Arc::new(config.proxy.clone()),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id(req),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            proxy_url = %self.config.proxy.proxy_url(),
            integration_host = %self.config.proxy.integration_host,
            circuit_breaker = self.config.circuit_breaker.activate,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router with state attached, for driving the gateway without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Catch-all handler.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();
    let method = request.method().to_string();

    let response = if state.rules.should_forward(&request) {
        forward(&state, request, &request_id).await
    } else {
        tracing::debug!(request_id = %request_id, path = %request.uri().path(), "Path not forwarded");
        (StatusCode::OK, "OK").into_response()
    };

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

async fn forward(state: &AppState, request: Request<Body>, request_id: &str) -> Response {
    match build_forward_request(request, &state.proxy).await {
        Ok(forward_request) => relay(state.dispatcher.dispatch(forward_request).await),
        Err(e) => {
            tracing::warn!(request_id = %request_id, status = %e.status(), error = %e, "Inbound request rejected");
            error_response(e.status(), e.to_string())
        }
    }
}
