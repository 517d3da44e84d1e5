//! Core forwarding engine.
//!
//! `process` is the whole request lifecycle: overload check, admission,
//! cache lookup, forwarding, integrity checks, metadata enrichment, and
//! caching. The admission permit is held across every path inside
//! `process_admitted`, so the slot is released exactly once no matter how
//! the request ends.

use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheStats, TtlCache},
    config::AppConfig,
    limiter::BirdeyePacer,
    metadata::{birdeye::BirdeyeClient, MetadataFetcher, MetadataOrigin},
    queue::{AdmissionQueue, QueueStats},
    types::{
        cache_key, JsonRpcRequest, JsonRpcResponse, MetadataSource, TokenMetadata,
        COIN_METADATA_METHOD,
    },
    upstream::{RpcClient, UpstreamError},
};

use super::{
    decompress::decompress_body,
    errors::ProxyError,
    fallback::{FallbackClient, FallbackError},
};

/// How a response was produced, for the `X-Cache` / `X-Source` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    /// Served from one of the two caches.
    Cache,
    /// Forwarded through the primary endpoint.
    Primary,
    /// Served by the direct-call fallback endpoint.
    Fallback,
}

/// A processed request: the response body plus its provenance markers.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub body: Value,
    pub served_by: ServedBy,
    pub metadata_source: Option<MetadataSource>,
}

/// The relay's forwarding engine. Thread-safe; shared via `Arc`.
pub struct ProxyEngine {
    config: Arc<AppConfig>,
    client: RpcClient,
    fallback: FallbackClient,
    admission: Arc<AdmissionQueue>,
    responses: Arc<TtlCache<Value>>,
    metadata_cache: Arc<TtlCache<TokenMetadata>>,
    fetcher: MetadataFetcher,
}

impl ProxyEngine {
    /// Builds the engine and all of its collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Internal`] when an HTTP client cannot be built.
    pub fn new(config: Arc<AppConfig>) -> Result<Self, ProxyError> {
        let client = RpcClient::new(config.request_timeout())
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        let fallback = FallbackClient::new(
            config.upstream.fallback_url.clone(),
            config.fallback_timeout(),
            config.queue.max_concurrent,
        )
        .map_err(|e| ProxyError::Internal(e.to_string()))?;

        let responses = Arc::new(TtlCache::new(
            "responses",
            std::time::Duration::from_secs(config.cache.response_ttl_seconds),
        ));
        let metadata_cache = Arc::new(TtlCache::new(
            "metadata",
            std::time::Duration::from_secs(config.cache.metadata_ttl_seconds),
        ));

        let birdeye = Arc::new(
            BirdeyeClient::new(&config.birdeye).map_err(|e| ProxyError::Internal(e.to_string()))?,
        );
        let pacer = Arc::new(BirdeyePacer::new(config.birdeye.max_per_second));
        let fetcher = MetadataFetcher::new(Arc::clone(&metadata_cache), pacer, birdeye);

        Ok(Self {
            admission: AdmissionQueue::new(config.queue.clone()),
            client,
            fallback,
            responses,
            metadata_cache,
            fetcher,
            config,
        })
    }

    /// Spawns the cache sweep tasks.
    pub fn start_background_tasks(&self) {
        let interval = self.config.sweep_interval();
        self.responses.start_sweep_task(interval);
        self.metadata_cache.start_sweep_task(interval);
    }

    /// Processes one JSON-RPC request end to end.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::InvalidRequest`] for malformed envelopes
    /// - [`ProxyError::UpstreamRateLimited`] when both paths fail with a
    ///   rate-limit signature
    /// - [`ProxyError::BadGateway`] when both paths fail outright
    pub async fn process(&self, request: JsonRpcRequest) -> Result<Relayed, ProxyError> {
        request.validate().map_err(ProxyError::InvalidRequest)?;

        let key = cache_key(&request.method, request.params.as_ref());

        // Under overload the queue is not worth joining; go straight to the
        // secondary endpoint.
        if self.admission.overloaded() {
            info!(method = %request.method, "system overloaded, bypassing admission queue");
            return self.serve_via_fallback(&request, &key).await;
        }

        let _permit = self.admission.acquire().await;
        self.process_admitted(&request, &key).await
        // _permit drops here on every path, scheduling the slot release.
    }

    async fn process_admitted(
        &self,
        request: &JsonRpcRequest,
        key: &str,
    ) -> Result<Relayed, ProxyError> {
        // Coin-metadata requests get a dedicated long-TTL lookup keyed by
        // coin type, independent of the generic response cache.
        if request.method == COIN_METADATA_METHOD {
            if let Some(coin_type) = request.coin_type_param() {
                if let Some(meta) = self.metadata_cache.get(&coin_type) {
                    debug!(coin_type = %coin_type, "metadata cache hit");
                    return Ok(Relayed {
                        body: metadata_envelope(request, &meta)?,
                        served_by: ServedBy::Cache,
                        metadata_source: Some(MetadataSource::Birdeye),
                    });
                }
            }
        }

        if let Some(cached) = self.responses.get(key) {
            debug!(method = %request.method, "response cache hit");
            return Ok(Relayed {
                body: with_request_id(cached, request),
                served_by: ServedBy::Cache,
                metadata_source: None,
            });
        }

        match self.forward_primary(request, key).await {
            Ok(relayed) => Ok(relayed),
            Err(error) => {
                warn!(method = %request.method, %error, "primary path failed, using fallback");
                self.serve_via_fallback(request, key).await
            }
        }
    }

    /// Forwards through the primary endpoint and post-processes the body.
    async fn forward_primary(
        &self,
        request: &JsonRpcRequest,
        key: &str,
    ) -> Result<Relayed, UpstreamError> {
        let body = Bytes::from(
            serde_json::to_vec(request)
                .map_err(|e| UpstreamError::InvalidJson(format!("request serialization: {e}")))?,
        );

        let response = self.client.forward(&self.config.upstream.primary_url, body).await?;

        if response.is_html() {
            return Err(UpstreamError::HtmlErrorPage);
        }

        let raw = decompress_body(response.content_encoding.as_deref(), &response.body)?;
        if raw.is_empty() {
            return Err(UpstreamError::InvalidJson("empty response body".to_string()));
        }
        let value: Value =
            serde_json::from_slice(&raw).map_err(|e| UpstreamError::InvalidJson(e.to_string()))?;

        // A null coin-metadata result is worth enriching before it is
        // cached; everything else is cached as-is.
        if request.method == COIN_METADATA_METHOD
            && value.get("result").map_or(true, Value::is_null)
        {
            return Ok(self.enrich_metadata(request, key, value).await);
        }

        self.responses.insert(key, value.clone());
        Ok(Relayed { body: value, served_by: ServedBy::Primary, metadata_source: None })
    }

    /// Splices Birdeye or synthesized metadata into a null coin-metadata
    /// result and persists it into both caches. Never fails: the worst case
    /// is the synthesized placeholder.
    async fn enrich_metadata(
        &self,
        request: &JsonRpcRequest,
        key: &str,
        mut envelope: Value,
    ) -> Relayed {
        let Some(coin_type) = request.coin_type_param() else {
            // Nothing to enrich without a coin type; cache the envelope as a
            // plain response.
            self.responses.insert(key, envelope.clone());
            return Relayed { body: envelope, served_by: ServedBy::Primary, metadata_source: None };
        };

        let (meta, source) = match self.fetcher.get(&coin_type).await {
            Some((meta, MetadataOrigin::Fetched)) => (meta, MetadataSource::BirdeyeDirect),
            Some((meta, MetadataOrigin::Cache)) => (meta, MetadataSource::Birdeye),
            None => {
                info!(coin_type = %coin_type, "no metadata source had the token, synthesizing");
                (TokenMetadata::synthesized(&coin_type), MetadataSource::Fallback)
            }
        };

        // Caching the synthesized form too avoids re-querying a token that
        // is known to have no metadata anywhere.
        self.metadata_cache.insert(coin_type, meta.clone());
        if let Ok(result) = serde_json::to_value(&meta) {
            envelope["result"] = result;
        }
        self.responses.insert(key, envelope.clone());

        Relayed { body: envelope, served_by: ServedBy::Primary, metadata_source: Some(source) }
    }

    /// Serves the request through the secondary endpoint and caches the
    /// result under the original cache key.
    async fn serve_via_fallback(
        &self,
        request: &JsonRpcRequest,
        key: &str,
    ) -> Result<Relayed, ProxyError> {
        match self.fallback.call(&request.method, request.params.as_ref(), &request.id).await {
            Ok(value) => {
                self.responses.insert(key, value.clone());
                Ok(Relayed { body: value, served_by: ServedBy::Fallback, metadata_source: None })
            }
            Err(FallbackError::RateLimited(message)) => {
                warn!(method = %request.method, message, "fallback rate limited");
                Err(ProxyError::UpstreamRateLimited(message))
            }
            Err(FallbackError::Unavailable(message)) => {
                warn!(method = %request.method, message, "fallback unavailable");
                Err(ProxyError::BadGateway(message))
            }
        }
    }

    /// Counters for the generic response cache.
    #[must_use]
    pub fn response_cache_stats(&self) -> CacheStats {
        self.responses.stats()
    }

    /// Counters for the token-metadata cache.
    #[must_use]
    pub fn metadata_cache_stats(&self) -> CacheStats {
        self.metadata_cache.stats()
    }

    /// Admission queue counters.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        self.admission.stats()
    }

    /// In-flight direct fallback calls.
    #[must_use]
    pub fn fallback_in_flight(&self) -> usize {
        self.fallback.in_flight()
    }

    /// Every unexpired metadata entry, for the dump endpoint.
    #[must_use]
    pub fn metadata_snapshot(&self) -> Vec<(String, TokenMetadata)> {
        self.metadata_cache.entries_snapshot()
    }
}

/// Builds a coin-metadata envelope from cached metadata.
fn metadata_envelope(
    request: &JsonRpcRequest,
    meta: &TokenMetadata,
) -> Result<Value, ProxyError> {
    let result =
        serde_json::to_value(meta).map_err(|e| ProxyError::Internal(e.to_string()))?;
    let response = JsonRpcResponse::success(result, Arc::clone(&request.id));
    serde_json::to_value(response).map_err(|e| ProxyError::Internal(e.to_string()))
}

/// Rewrites the `id` of a cached response to echo the current request.
fn with_request_id(mut body: Value, request: &JsonRpcRequest) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert("id".to_string(), (*request.id).clone());
    }
    body
}
