//! Failure injection tests: unreachable backends, hung backends, and
//! connection pool behavior under the idle window.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use api_gateway::config::GatewayConfig;
use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn test_unreachable_backend_returns_502() {
    let backend = common::refused_addr().await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route("/orders", backend));

    let (gateway, shutdown) = common::spawn_gateway(config).await;
    let client = common::client();

    // Every request fails the same way, with a whole body each time.
    for _ in 0..3 {
        let response = client
            .get(format!("http://{gateway}/orders/orders"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.text().await.unwrap(),
            r#"{"error":"backend unreachable"}"#
        );
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_hung_backend_returns_504() {
    let (backend, accepts) = common::start_silent_backend().await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route("/products", backend));
    config.timeouts.response_header_secs = 1;

    let (gateway, shutdown) = common::spawn_gateway(config).await;
    let client = common::client();

    let start = Instant::now();
    let response = client
        .get(format!("http://{gateway}/products/products"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"error":"upstream timeout"}"#
    );
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    // The timed-out connection must not be pooled: a second request opens
    // a fresh one.
    let response = client
        .get(format!("http://{gateway}/products/products"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(accepts.load(Ordering::SeqCst), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_sequential_requests_reuse_connection() {
    let (backend, accepts) = common::start_static_backend("200 OK", "text/plain", "pooled").await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route("/products", backend));

    let (gateway, shutdown) = common::spawn_gateway(config).await;
    let client = common::client();

    for _ in 0..2 {
        let body = client
            .get(format!("http://{gateway}/products"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pooled");
    }

    // Both requests rode the same backend connection.
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_idle_window_elapsed_opens_fresh_connection() {
    let (backend, accepts) = common::start_static_backend("200 OK", "text/plain", "ok").await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route("/products", backend));
    config.timeouts.idle_secs = 1;

    let (gateway, shutdown) = common::spawn_gateway(config).await;
    let client = common::client();

    let response = client
        .get(format!("http://{gateway}/products"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(1300)).await;

    let response = client
        .get(format!("http://{gateway}/products"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(accepts.load(Ordering::SeqCst), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_one_backend_down_does_not_affect_others() {
    let dead = common::refused_addr().await;
    let (alive, _) = common::start_static_backend("200 OK", "text/plain", "alive").await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route("/orders", dead));
    config.routes.push(common::route("/products", alive));

    let (gateway, shutdown) = common::spawn_gateway(config).await;
    let client = common::client();

    let response = client
        .get(format!("http://{gateway}/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = client
        .get(format!("http://{gateway}/products"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "alive");

    shutdown.trigger();
}
