//! Failure injection tests for the gateway.

use std::time::{Duration, Instant};

use serde_json::Value;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

async fn error_message(res: reqwest::Response) -> String {
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], false);
    body["message"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_unreachable_downstream_without_breaker() {
    let gateway = common::spawn_gateway(common::config_for(&common::closed_address())).await;

    let res = common::client().get(gateway.url("/ping")).send().await.expect("Gateway unreachable");
    let message = error_message(res).await;
    assert!(message.starts_with("connection failed"), "unexpected message: {}", message);
}

#[tokio::test]
async fn test_connection_failures_open_the_breaker() {
    let gateway = common::spawn_gateway(common::with_small_breaker(common::config_for(&common::closed_address()))).await;
    let client = common::client();

    for _ in 0..2 {
        let message = error_message(client.get(gateway.url("/ping")).send().await.unwrap()).await;
        assert!(message.starts_with("connection failed"), "unexpected message: {}", message);
    }

    let message = error_message(client.get(gateway.url("/ping")).send().await.unwrap()).await;
    assert!(message.contains("is OPEN and does not permit further calls"));
}

#[tokio::test]
async fn test_retries_exhausted_against_unreachable_downstream() {
    let mut config = common::with_small_breaker(common::config_for(&common::closed_address()));
    config.circuit_breaker.sliding_window_size = 10;
    config.circuit_breaker.minimum_number_of_calls = 10;
    config.circuit_breaker.retry.activate = true;
    config.circuit_breaker.retry.max_attempts = 3;
    config.circuit_breaker.retry.wait_duration_ms = 20;

    let gateway = common::spawn_gateway(config).await;
    let message = error_message(common::client().get(gateway.url("/ping")).send().await.unwrap()).await;
    assert!(message.starts_with("Retries exhausted after 3 attempts"), "unexpected message: {}", message);
}

#[tokio::test]
async fn test_time_limiter_bounds_slow_downstream() {
    let downstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&downstream)
        .await;

    let mut config = common::with_small_breaker(common::config_for(&downstream.uri()));
    config.circuit_breaker.time_limiter.activate = true;
    config.circuit_breaker.time_limiter.overall_timeout_ms = 200;
    config.circuit_breaker.time_limiter.cancel_running_future = true;

    let gateway = common::spawn_gateway(config).await;

    let started = Instant::now();
    let message = error_message(common::client().get(gateway.url("/slow")).send().await.unwrap()).await;
    assert!(message.starts_with("Call did not complete within"), "unexpected message: {}", message);
    assert!(started.elapsed() < Duration::from_secs(2), "caller should be released at the deadline");
}

#[tokio::test]
async fn test_concurrent_requests_share_one_breaker() {
    let downstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&downstream)
        .await;

    let mut config = common::with_small_breaker(common::config_for(&downstream.uri()));
    config.circuit_breaker.sliding_window_size = 50;
    config.circuit_breaker.minimum_number_of_calls = 50;
    let gateway = common::spawn_gateway(config).await;
    let client = common::client();

    let mut handles = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let url = gateway.url(&format!("/items/{}", i));
        handles.push(tokio::spawn(async move { client.get(url).send().await.map(|r| r.status().as_u16()) }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 200);
    }
    assert_eq!(downstream.received_requests().await.unwrap().len(), 20);
}
