//! Direct JSON-RPC calls to the secondary endpoint.
//!
//! Used when the system is overloaded (bypassing the admission queue
//! entirely) and when the primary path fails. The client keeps its own
//! in-flight counter: exceeding the ceiling does not queue, it just sleeps
//! proportionally to the overage before issuing the call.

use reqwest::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Failures of the fallback path. These do surface to the client, as 429
/// when the signature looks like rate limiting and 502 otherwise.
#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("fallback rpc rate limited: {0}")]
    RateLimited(String),

    #[error("fallback rpc unavailable: {0}")]
    Unavailable(String),
}

/// Heuristic for rate-limit symptoms: an embedded 429 marker or a reset
/// connection, which public endpoints use interchangeably when shedding.
#[must_use]
pub fn looks_rate_limited(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("429") || lower.contains("connection reset") || lower.contains("econnreset")
}

/// Self-throttling client for the secondary endpoint.
pub struct FallbackClient {
    client: Client,
    url: String,
    in_flight: AtomicUsize,
    max_concurrent: usize,
    overage_delay: Duration,
}

impl FallbackClient {
    /// # Errors
    ///
    /// Returns [`FallbackError::Unavailable`] if reqwest fails to build.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        max_concurrent: usize,
    ) -> Result<Self, FallbackError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .use_rustls_tls()
            .user_agent("sui-relay/0.1.0")
            .build()
            .map_err(|e| FallbackError::Unavailable(format!("client build failed: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            in_flight: AtomicUsize::new(0),
            max_concurrent,
            overage_delay: Duration::from_millis(250),
        })
    }

    /// Issues a single JSON-RPC call, bypassing the admission queue.
    ///
    /// # Errors
    ///
    /// Returns [`FallbackError::RateLimited`] when the failure carries a
    /// rate-limit signature and [`FallbackError::Unavailable`] otherwise.
    pub async fn call(
        &self,
        method: &str,
        params: Option<&Value>,
        id: &Value,
    ) -> Result<Value, FallbackError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        if in_flight > self.max_concurrent {
            let overage = (in_flight - self.max_concurrent) as u32;
            let pause = self.overage_delay * overage;
            debug!(in_flight, pause_ms = pause.as_millis() as u64, "fallback self-throttle");
            tokio::time::sleep(pause).await;
        }

        let result = self.execute(method, params, id).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// In-flight counter, reported on `/health`.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn execute(
        &self,
        method: &str,
        params: Option<&Value>,
        id: &Value,
    ) -> Result<Value, FallbackError> {
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params.cloned().unwrap_or(Value::Array(Vec::new())),
        });

        let response = self
            .client
            .post(&self.url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| classify(&e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FallbackError::RateLimited("fallback returned HTTP 429".to_string()));
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "fallback rpc returned an error status");
            return Err(classify(&format!("fallback returned HTTP {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FallbackError::Unavailable(format!("invalid JSON from fallback: {e}")))
    }
}

fn classify(message: &str) -> FallbackError {
    if looks_rate_limited(message) {
        FallbackError::RateLimited(message.to_string())
    } else {
        FallbackError::Unavailable(message.to_string())
    }
}
