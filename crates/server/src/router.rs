//! HTTP handlers for the relay.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{
    proxy::{ProxyError, Relayed, ServedBy},
    types::JsonRpcRequest,
};
use serde_json::json;
use tracing::debug;

use crate::AppState;

static X_CACHE: HeaderName = HeaderName::from_static("x-cache");
static X_METADATA_SOURCE: HeaderName = HeaderName::from_static("x-metadata-source");
static X_SOURCE: HeaderName = HeaderName::from_static("x-source");

/// Handles `POST /sui`: parses the JSON-RPC envelope and relays it.
pub async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "Invalid request", &format!("malformed JSON body: {e}")),
    };

    let request: JsonRpcRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid request",
                &format!("not a JSON-RPC envelope: {e}"),
            )
        }
    };

    debug!(method = %request.method, "relaying rpc request");
    match state.engine.process(request).await {
        Ok(relayed) => relayed_response(relayed),
        Err(ProxyError::InvalidRequest(message)) => {
            error_response(StatusCode::BAD_REQUEST, "Invalid request", &message)
        }
        Err(ProxyError::UpstreamRateLimited(message)) => {
            error_response(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests", &message)
        }
        Err(ProxyError::BadGateway(message)) => {
            error_response(StatusCode::BAD_GATEWAY, "Bad Gateway", &message)
        }
        Err(ProxyError::Internal(message)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", &message)
        }
    }
}

fn relayed_response(relayed: Relayed) -> Response {
    let mut response = (StatusCode::OK, Json(relayed.body)).into_response();
    let headers = response.headers_mut();

    if relayed.served_by == ServedBy::Cache {
        headers.insert(X_CACHE.clone(), HeaderValue::from_static("HIT"));
    }
    if relayed.served_by == ServedBy::Fallback {
        headers.insert(X_SOURCE.clone(), HeaderValue::from_static("fallback-rpc"));
    }
    if let Some(source) = relayed.metadata_source {
        headers.insert(X_METADATA_SOURCE.clone(), HeaderValue::from_static(source.as_str()));
    }

    response
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

/// Handles `GET /metadata-cache`: dumps every unexpired metadata entry.
pub async fn handle_metadata_cache(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.engine.metadata_snapshot();
    let metadata: serde_json::Map<String, serde_json::Value> = entries
        .into_iter()
        .filter_map(|(coin_type, meta)| {
            serde_json::to_value(meta).ok().map(|value| (coin_type, value))
        })
        .collect();

    Json(json!({
        "count": metadata.len(),
        "metadata": metadata,
    }))
}

/// Handles `GET /health`: cache, queue, and rate-limit counters.
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "cache": {
            "responses": state.engine.response_cache_stats(),
            "metadata": state.engine.metadata_cache_stats(),
        },
        "queue": state.engine.queue_stats(),
        "rate_limit": state.limiter.snapshot(),
        "fallback_in_flight": state.engine.fallback_in_flight(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
