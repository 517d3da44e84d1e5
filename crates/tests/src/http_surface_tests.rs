//! Tests for the HTTP contract: headers, status codes, and body shapes.

use crate::mock_infrastructure::{test_config, BirdeyeMockBuilder, RpcMockBuilder};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use relay_core::{config::AppConfig, limiter::ServerRateLimiter, proxy::ProxyEngine};
use serde_json::{json, Value};
use server::{build_app, AppState};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

fn app_for(config: AppConfig, rate_limit: u64) -> Router {
    let engine = Arc::new(ProxyEngine::new(Arc::new(config.clone())).unwrap());
    let limiter = Arc::new(ServerRateLimiter::new(rate_limit, Duration::from_secs(60)));
    build_app(AppState { engine, limiter }, &config)
}

fn rpc_request(body: Value) -> Request<Body> {
    Request::builder()
        .uri("/sui")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_cache_hit_header() {
    let mut primary = RpcMockBuilder::new().await;
    let fallback = RpcMockBuilder::new().await;
    let birdeye = BirdeyeMockBuilder::new().await;
    let _rpc = primary.rpc_result(&json!("0x2a")).create_async().await;

    let app = app_for(test_config(&primary.url(), &fallback.url(), &birdeye.url()), 500);
    let envelope = json!({
        "jsonrpc": "2.0",
        "method": "sui_getTotalTransactionBlocks",
        "params": [],
        "id": 1
    });

    let first = app.clone().oneshot(rpc_request(envelope.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert!(first.headers().get("x-cache").is_none());

    let second = app.oneshot(rpc_request(envelope)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("x-cache").unwrap(), "HIT");
}

#[tokio::test]
async fn test_fallback_source_header() {
    let mut primary = RpcMockBuilder::new().await;
    let mut fallback = RpcMockBuilder::new().await;
    let birdeye = BirdeyeMockBuilder::new().await;
    let _rpc = primary.html_error_page().create_async().await;
    let _rescue = fallback.rpc_result(&json!("0x2a")).create_async().await;

    let app = app_for(test_config(&primary.url(), &fallback.url(), &birdeye.url()), 500);
    let response = app
        .oneshot(rpc_request(json!({
            "jsonrpc": "2.0",
            "method": "sui_getTotalTransactionBlocks",
            "params": [],
            "id": 1
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-source").unwrap(), "fallback-rpc");

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["result"], json!("0x2a"));
}

#[tokio::test]
async fn test_metadata_source_header_on_enrichment() {
    let mut primary = RpcMockBuilder::new().await;
    let fallback = RpcMockBuilder::new().await;
    let mut birdeye = BirdeyeMockBuilder::new().await;
    let _rpc = primary.null_coin_metadata().create_async().await;
    let _lookup = birdeye.token(6, "FOO", "Foo Coin").create_async().await;

    let app = app_for(test_config(&primary.url(), &fallback.url(), &birdeye.url()), 500);
    let envelope = json!({
        "jsonrpc": "2.0",
        "method": "suix_getCoinMetadata",
        "params": ["0xabc::mod::COIN"],
        "id": 1
    });

    let first = app.clone().oneshot(rpc_request(envelope.clone())).await.unwrap();
    assert_eq!(first.headers().get("x-metadata-source").unwrap(), "birdeye-direct");

    let second = app.oneshot(rpc_request(envelope)).await.unwrap();
    assert_eq!(second.headers().get("x-cache").unwrap(), "HIT");
    assert_eq!(second.headers().get("x-metadata-source").unwrap(), "birdeye");
}

// Requests beyond the per-window ceiling are rejected with limiter counters.
#[tokio::test]
async fn test_rate_limit_ceiling_enforced() {
    let mut primary = RpcMockBuilder::new().await;
    let fallback = RpcMockBuilder::new().await;
    let birdeye = BirdeyeMockBuilder::new().await;
    let _rpc = primary.rpc_result(&json!("0x2a")).create_async().await;

    let app = app_for(test_config(&primary.url(), &fallback.url(), &birdeye.url()), 5);
    let envelope = json!({
        "jsonrpc": "2.0",
        "method": "sui_getTotalTransactionBlocks",
        "params": [],
        "id": 1
    });

    for _ in 0..5 {
        let response = app.clone().oneshot(rpc_request(envelope.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let rejected = app.clone().oneshot(rpc_request(envelope.clone())).await.unwrap();
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);

    let body = body_to_json(rejected.into_body()).await;
    assert_eq!(body["limit"], 5);
    assert!(body["current"].as_u64().unwrap() > 5);
    assert_eq!(body["remaining"], 0);
    assert!(body.get("resetIn").is_some());
}

#[tokio::test]
async fn test_metadata_cache_endpoint_reflects_enriched_tokens() {
    let mut primary = RpcMockBuilder::new().await;
    let fallback = RpcMockBuilder::new().await;
    let mut birdeye = BirdeyeMockBuilder::new().await;
    let _rpc = primary.null_coin_metadata().create_async().await;
    let _lookup = birdeye.token(6, "FOO", "Foo Coin").create_async().await;

    let app = app_for(test_config(&primary.url(), &fallback.url(), &birdeye.url()), 500);

    let _ = app
        .clone()
        .oneshot(rpc_request(json!({
            "jsonrpc": "2.0",
            "method": "suix_getCoinMetadata",
            "params": ["0xabc::mod::COIN"],
            "id": 1
        })))
        .await
        .unwrap();

    let dump = app
        .oneshot(Request::builder().uri("/metadata-cache").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(dump.status(), StatusCode::OK);

    let body = body_to_json(dump.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["metadata"]["0xabc::mod::COIN"]["symbol"], json!("FOO"));
    assert_eq!(body["metadata"]["0xabc::mod::COIN"]["decimals"], json!(6));
}

#[tokio::test]
async fn test_bad_gateway_shape_when_everything_fails() {
    let mut primary = RpcMockBuilder::new().await;
    let mut fallback = RpcMockBuilder::new().await;
    let birdeye = BirdeyeMockBuilder::new().await;
    let _rpc = primary.html_error_page().create_async().await;
    let _rescue = fallback.status(500).create_async().await;

    let app = app_for(test_config(&primary.url(), &fallback.url(), &birdeye.url()), 500);
    let response = app
        .oneshot(rpc_request(json!({
            "jsonrpc": "2.0",
            "method": "sui_getTotalTransactionBlocks",
            "params": [],
            "id": 1
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["error"], "Bad Gateway");
    assert!(body.get("message").is_some());
    assert!(body.get("timestamp").is_some());
}

#[tokio::test]
async fn test_health_reports_cache_hits_after_traffic() {
    let mut primary = RpcMockBuilder::new().await;
    let fallback = RpcMockBuilder::new().await;
    let birdeye = BirdeyeMockBuilder::new().await;
    let _rpc = primary.rpc_result(&json!("0x2a")).create_async().await;

    let app = app_for(test_config(&primary.url(), &fallback.url(), &birdeye.url()), 500);
    let envelope = json!({
        "jsonrpc": "2.0",
        "method": "sui_getTotalTransactionBlocks",
        "params": [],
        "id": 1
    });

    let _ = app.clone().oneshot(rpc_request(envelope.clone())).await.unwrap();
    let _ = app.clone().oneshot(rpc_request(envelope)).await.unwrap();

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_to_json(health.into_body()).await;

    assert_eq!(body["status"], "ok");
    assert!(body["cache"]["responses"]["hits"].as_u64().unwrap() >= 1);
    assert_eq!(body["cache"]["responses"]["keys"], 1);
}
