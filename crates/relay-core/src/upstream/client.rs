//! HTTP client for the primary Sui RPC endpoint.
//!
//! Compression negotiation is disabled on the outbound leg
//! (`Accept-Encoding: identity`) to keep body handling simple, but some
//! upstreams ignore the header, so the response's `content-encoding` is
//! surfaced to the caller for defensive decompression.

use bytes::Bytes;
use reqwest::{
    header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE},
    Client, ClientBuilder,
};
use std::time::Duration;
use tracing::trace;

use super::errors::{sanitize_network_error, UpstreamError};

/// A buffered upstream response with the headers the relay cares about.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Whether the body claims to be an HTML page — the signature of an
    /// edge/CDN error page rather than a JSON-RPC response.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }
}

/// Outbound client for the primary endpoint.
pub struct RpcClient {
    client: Client,
    timeout: Duration,
}

impl RpcClient {
    /// Creates the client with the relay's outbound connection policy.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::ClientBuild`] if reqwest fails to build.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent("sui-relay/0.1.0")
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build upstream http client");
                UpstreamError::ClientBuild(e.to_string())
            })?;

        Ok(Self { client, timeout })
    }

    /// Forwards a buffered JSON-RPC body to the given endpoint.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] when the request times out
    /// - [`UpstreamError::HttpStatus`] for non-2xx responses
    /// - [`UpstreamError::ConnectionFailed`] for other transport failures
    pub async fn forward(&self, url: &str, body: Bytes) -> Result<UpstreamResponse, UpstreamError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT_ENCODING, "identity")
            .body(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::ConnectionFailed(sanitize_network_error(&e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::ConnectionFailed(sanitize_network_error(&e))
            }
        })?;

        trace!(
            status = status.as_u16(),
            encoding = content_encoding.as_deref().unwrap_or("identity"),
            bytes = body.len(),
            "upstream response buffered"
        );

        Ok(UpstreamResponse { status: status.as_u16(), content_type, content_encoding, body })
    }
}
