//! JSON-RPC envelope and token-metadata types.
//!
//! The envelope types conform to JSON-RPC 2.0. Construction helpers avoid
//! allocating the protocol version string, and request IDs use
//! `Arc<serde_json::Value>` so they can be echoed into responses cheaply.

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, sync::Arc};

/// JSON-RPC protocol version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for the JSON-RPC version.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// The one RPC method with special-cased caching and enrichment.
pub const COIN_METADATA_METHOD: &str = "suix_getCoinMetadata";

/// Namespace separator in Sui coin type paths (`0xabc::module::COIN`).
pub const COIN_TYPE_SEPARATOR: &str = "::";

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new request with zero allocation for the version string.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: serde_json::Value,
    ) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id: Arc::new(id) }
    }

    /// Validates the envelope structure.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first violation: a version other
    /// than `"2.0"` or an empty method name.
    pub fn validate(&self) -> Result<(), String> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(format!("unsupported jsonrpc version: {:?}", self.jsonrpc));
        }
        if self.method.is_empty() {
            return Err("method must not be empty".to_string());
        }
        Ok(())
    }

    /// Extracts the coin type from the first positional parameter.
    ///
    /// Returns `None` when the params are absent or the first element is not
    /// a string, which callers treat as "not enrichable".
    #[must_use]
    pub fn coin_type_param(&self) -> Option<String> {
        self.params.as_ref()?.get(0)?.as_str().map(ToOwned::to_owned)
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Creates a successful response echoing the given request ID.
    #[must_use]
    pub fn success(result: serde_json::Value, id: Arc<serde_json::Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    /// Creates an error response echoing the given request ID.
    #[must_use]
    pub fn error(code: i32, message: String, id: Arc<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message, data: None }),
            id,
        }
    }
}

/// Derives the response-cache key from a method name and its parameters.
///
/// The params are serialized so that structurally identical requests share
/// one entry regardless of request ID.
#[must_use]
pub fn cache_key(method: &str, params: Option<&serde_json::Value>) -> String {
    match params {
        Some(p) => format!("{method}:{p}"),
        None => format!("{method}:null"),
    }
}

/// Canonical token-metadata shape served for coin-metadata requests,
/// whether sourced from cache, the upstream RPC, Birdeye, or synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    pub description: String,
}

impl TokenMetadata {
    /// Synthesizes placeholder metadata for a token nothing knows about.
    ///
    /// Symbol and name fall back to the trailing path segment of the coin
    /// type so `0xabc::mod::COIN` renders as `COIN`.
    #[must_use]
    pub fn synthesized(coin_type: &str) -> Self {
        let tail = trailing_segment(coin_type);
        Self {
            decimals: 9,
            symbol: tail.clone(),
            name: tail,
            description: "Metadata unavailable for this token".to_string(),
        }
    }
}

/// Returns the trailing `::`-separated segment of a coin type path.
#[must_use]
pub fn trailing_segment(coin_type: &str) -> String {
    coin_type.rsplit(COIN_TYPE_SEPARATOR).next().unwrap_or(coin_type).to_string()
}

/// Where enriched token metadata came from, emitted as `X-Metadata-Source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    /// Fetched from the Birdeye API during this request.
    BirdeyeDirect,
    /// Served from the long-TTL metadata cache (originally Birdeye).
    Birdeye,
    /// Synthesized placeholder; no source had the token.
    Fallback,
}

impl MetadataSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BirdeyeDirect => "birdeye-direct",
            Self::Birdeye => "birdeye",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
