//! Server-wide rate limiting middleware for the RPC route.
//!
//! Translates a rejected `ServerRateLimiter::check` into the 429 JSON shape
//! clients rely on for backoff hints. The limiter counter keeps climbing on
//! rejected requests, so `current` can exceed `limit`.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::limiter::ServerRateLimiter;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<ServerRateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if limiter.check() {
        return next.run(request).await;
    }

    let snapshot = limiter.snapshot();
    warn!(current = snapshot.current, limit = snapshot.limit, "inbound rate limit exceeded");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Rate limit exceeded",
            "message": "Too many requests, please retry after the window resets",
            "limit": snapshot.limit,
            "current": snapshot.current,
            "remaining": snapshot.remaining,
            "resetIn": snapshot.reset_in_secs,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}
