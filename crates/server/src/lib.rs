//! HTTP layer for the Sui RPC relay.
//!
//! Routing splits into a public router (`/health`, `/metadata-cache`) that
//! is exempt from rate limiting, and the RPC route (`POST /sui`) behind the
//! server-wide limiter, a request body cap, and request-id propagation.

pub mod middleware;
pub mod router;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use relay_core::{config::AppConfig, limiter::ServerRateLimiter, proxy::ProxyEngine};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
    pub limiter: Arc<ServerRateLimiter>,
}

/// Assembles the full application router.
#[must_use]
pub fn build_app(state: AppState, config: &AppConfig) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();
    let (set_request_id_public, propagate_request_id_public) =
        middleware::create_request_id_layers();

    let public = Router::new()
        .route("/health", get(router::handle_health))
        .route("/metadata-cache", get(router::handle_metadata_cache))
        .with_state(state.clone())
        .layer(propagate_request_id_public)
        .layer(set_request_id_public);

    let rpc = Router::new()
        .route("/sui", post(router::handle_rpc))
        .with_state(state.clone())
        .layer(axum_middleware::from_fn_with_state(
            state.limiter,
            middleware::rate_limit_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .layer(propagate_request_id)
        .layer(set_request_id);

    public.merge(rpc)
}
