//! Mock upstreams for relay tests.
//!
//! Wraps mockito to provide Sui-flavored response builders for the primary
//! RPC endpoint, the fallback endpoint, and the Birdeye metadata API. Each
//! builder method returns an un-created [`Mock`] so tests can attach
//! expectations before calling `create_async`.

use mockito::{Matcher, Mock, Server, ServerGuard};
use relay_core::config::AppConfig;
use serde_json::{json, Value};

/// Regex matching the Birdeye single-token metadata route.
pub const BIRDEYE_ROUTE: &str = "/defi/v3/token/meta-data/single.*";

/// Builder for a mock RPC endpoint (primary or fallback).
pub struct RpcMockBuilder {
    server: ServerGuard,
}

impl RpcMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Any JSON-RPC POST answered with the given result value.
    pub fn rpc_result(&mut self, result: &Value) -> Mock {
        self.server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"jsonrpc": "2.0", "result": result, "id": 1}).to_string())
    }

    /// A JSON-RPC POST for one specific method.
    pub fn method_result(&mut self, method: &str, result: &Value) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"jsonrpc": "2.0", "result": result, "id": 1}).to_string())
    }

    /// A coin-metadata call whose `result` is null, the shape that triggers
    /// enrichment.
    pub fn null_coin_metadata(&mut self) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::Regex(r#""method"\s*:\s*"suix_getCoinMetadata""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","result":null,"id":1}"#)
    }

    /// An HTML error page, the signature of a misrouted edge response.
    pub fn html_error_page(&mut self) -> Mock {
        self.server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body><h1>502 Bad Gateway</h1></body></html>")
    }

    /// A body that fails JSON validation.
    pub fn garbage_body(&mut self) -> Mock {
        self.server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("this is not json")
    }

    /// A plain HTTP error status.
    pub fn status(&mut self, status: usize) -> Mock {
        self.server.mock("POST", "/").with_status(status)
    }

    /// A gzip-compressed JSON-RPC response, despite the relay asking for
    /// identity encoding.
    pub fn gzip_result(&mut self, result: &Value) -> Mock {
        use std::io::Write;
        let body = json!({"jsonrpc": "2.0", "result": result, "id": 1}).to_string();
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        self.server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("content-encoding", "gzip")
            .with_body(compressed)
    }
}

/// Builder for a mock Birdeye API.
pub struct BirdeyeMockBuilder {
    server: ServerGuard,
}

impl BirdeyeMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// A successful metadata lookup.
    pub fn token(&mut self, decimals: u8, symbol: &str, name: &str) -> Mock {
        self.server
            .mock("GET", Matcher::Regex(BIRDEYE_ROUTE.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "success": true,
                    "data": {"decimals": decimals, "symbol": symbol, "name": name}
                })
                .to_string(),
            )
    }

    /// An unknown token (successful call, no data).
    pub fn unknown_token(&mut self) -> Mock {
        self.server
            .mock("GET", Matcher::Regex(BIRDEYE_ROUTE.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false}"#)
    }

    /// An API failure.
    pub fn failure(&mut self) -> Mock {
        self.server.mock("GET", Matcher::Regex(BIRDEYE_ROUTE.to_string())).with_status(500)
    }
}

/// Relay configuration pointed at mock endpoints, with fast queue pacing so
/// tests stay quick.
#[must_use]
pub fn test_config(primary_url: &str, fallback_url: &str, birdeye_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.upstream.primary_url = primary_url.to_string();
    config.upstream.fallback_url = fallback_url.to_string();
    config.upstream.request_timeout_seconds = 5;
    config.upstream.fallback_timeout_seconds = 5;
    config.birdeye.base_url = birdeye_url.to_string();
    config.birdeye.api_key = Some("test-key".to_string());
    config.queue.settle_delay_ms = 5;
    config.queue.per_waiter_delay_ms = 1;
    config.queue.max_extra_delay_ms = 10;
    config
}
