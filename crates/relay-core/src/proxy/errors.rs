//! Engine-boundary error taxonomy.
//!
//! Only these errors reach the HTTP layer. Upstream and decompression
//! failures are handled inside the engine by switching to the fallback
//! path; what escapes here is what the client actually sees.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed inbound envelope. Maps to 400.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Both paths failed with a rate-limit signature. Maps to 429.
    #[error("upstream rate limited: {0}")]
    UpstreamRateLimited(String),

    /// Both the primary path and the fallback failed. Maps to 502.
    #[error("bad gateway: {0}")]
    BadGateway(String),

    /// A relay-side defect (serialization and the like). Maps to 500.
    #[error("internal error: {0}")]
    Internal(String),
}
