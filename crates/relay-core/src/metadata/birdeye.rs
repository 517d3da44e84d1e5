//! HTTP client for the Birdeye token-metadata API.

use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::BirdeyeConfig;

/// Failures from the Birdeye API. These never surface to the end caller;
/// the fetcher absorbs them and falls back to synthesized metadata.
#[derive(Error, Debug)]
pub enum BirdeyeError {
    #[error("birdeye client build failed: {0}")]
    ClientBuild(String),

    #[error("birdeye request failed: {0}")]
    Request(String),

    #[error("birdeye returned HTTP {0}")]
    HttpStatus(u16),

    #[error("birdeye response could not be parsed: {0}")]
    InvalidBody(String),
}

#[derive(Debug, Deserialize)]
struct BirdeyeEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<RawTokenMetadata>,
}

/// Partially populated metadata as Birdeye returns it. Missing fields are
/// filled by the fetcher's normalization pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTokenMetadata {
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Thin client for the single metadata endpoint the relay uses.
pub struct BirdeyeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BirdeyeClient {
    /// # Errors
    ///
    /// Returns [`BirdeyeError::ClientBuild`] if reqwest fails to build.
    pub fn new(config: &BirdeyeConfig) -> Result<Self, BirdeyeError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .use_rustls_tls()
            .user_agent("sui-relay/0.1.0")
            .build()
            .map_err(|e| BirdeyeError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetches metadata for one coin type.
    ///
    /// `Ok(None)` means Birdeye answered but does not know the token (or the
    /// client has no API key); `Err` means the call itself failed.
    ///
    /// # Errors
    ///
    /// Returns [`BirdeyeError`] for transport failures, non-2xx statuses,
    /// and unparseable bodies.
    pub async fn fetch(&self, coin_type: &str) -> Result<Option<RawTokenMetadata>, BirdeyeError> {
        let Some(api_key) = &self.api_key else {
            debug!("no birdeye api key configured, skipping lookup");
            return Ok(None);
        };

        let url = format!("{}/defi/v3/token/meta-data/single", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("address", coin_type)])
            .header("X-API-KEY", api_key)
            .header("x-chain", "sui")
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| BirdeyeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BirdeyeError::HttpStatus(status.as_u16()));
        }

        let envelope: BirdeyeEnvelope =
            response.json().await.map_err(|e| BirdeyeError::InvalidBody(e.to_string()))?;

        if !envelope.success {
            debug!(coin_type, "birdeye reported an unsuccessful lookup");
            return Ok(None);
        }
        Ok(envelope.data)
    }
}
