//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use integration_gateway::config::GatewayConfig;
use integration_gateway::{GatewayServer, Shutdown};
use tokio::net::TcpListener;

/// A gateway running on an ephemeral port; stops when dropped.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the gateway with `config` on 127.0.0.1 and an ephemeral port.
pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config).expect("gateway should build");
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

/// Defaults pointed at `downstream` as both the proxy API host and the integration host.
pub fn config_for(downstream_uri: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.proxy.host = downstream_uri.to_string();
    config.proxy.proxy_api = "/api/proxy".into();
    config.proxy.integration_host = "http://integration.local:8081".into();
    config
}

/// Breaker enabled with a tiny window: two recorded outcomes decide.
pub fn with_small_breaker(mut config: GatewayConfig) -> GatewayConfig {
    let breaker = &mut config.circuit_breaker;
    breaker.activate = true;
    breaker.sliding_window_size = 2;
    breaker.minimum_number_of_calls = 2;
    breaker.failure_rate_threshold = 50.0;
    breaker.wait_duration_in_open_state_ms = 60_000;
    breaker.connect_timeout_ms = 500;
    breaker.read_timeout_ms = 5_000;
    config
}

/// An address nothing listens on.
pub fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Client that never pools or goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
