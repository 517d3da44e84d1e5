//! Error taxonomy for the primary upstream path.

use thiserror::Error;

/// Failures observed while forwarding to or reading from the primary
/// endpoint. Every variant triggers the direct-call fallback; none of them
/// surface to the client directly.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout.
    #[error("request timeout")]
    Timeout,

    /// Failed to reach the upstream endpoint.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Upstream answered with a non-success HTTP status.
    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),

    /// Upstream (or an edge/CDN in front of it) answered with an HTML error
    /// page instead of a JSON-RPC body.
    #[error("upstream returned an HTML error page")]
    HtmlErrorPage,

    /// The response body could not be decompressed.
    #[error("body decompression failed: {0}")]
    Decompress(String),

    /// The decompressed body was empty or failed JSON validation.
    #[error("invalid JSON from upstream: {0}")]
    InvalidJson(String),

    /// The underlying HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
}

/// Sanitizes reqwest errors to coarse categories so log lines and fallback
/// decisions never leak endpoint details.
#[must_use]
pub fn sanitize_network_error(error: &reqwest::Error) -> String {
    if error.is_connect() {
        "connection refused or unreachable".to_string()
    } else if error.is_timeout() {
        "connection timed out".to_string()
    } else if error.is_request() {
        "request failed".to_string()
    } else if error.is_body() {
        "response body error".to_string()
    } else if error.is_decode() {
        "response decode error".to_string()
    } else {
        "network error".to_string()
    }
}
