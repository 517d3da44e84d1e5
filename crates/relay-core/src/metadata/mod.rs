//! Coalescing token-metadata lookups.
//!
//! `MetadataFetcher::get` checks the long-TTL metadata cache, joins an
//! in-flight fetch for the same coin type when one exists, and otherwise
//! schedules a new Birdeye lookup through the pacer. At most one upstream
//! fetch is outstanding per coin type; every concurrent caller shares its
//! outcome. Lookup failures are absorbed — callers see `None` and apply
//! the synthesized fallback instead.

pub mod birdeye;

use futures::{future::Shared, FutureExt};
use parking_lot::Mutex;
use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};
use tracing::{debug, warn};

use crate::{
    cache::TtlCache,
    limiter::BirdeyePacer,
    types::{trailing_segment, TokenMetadata},
};
use birdeye::{BirdeyeClient, RawTokenMetadata};

type FetchFuture = Pin<Box<dyn Future<Output = Option<TokenMetadata>> + Send>>;
type SharedFetch = Shared<FetchFuture>;

/// Where a successful lookup's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOrigin {
    /// Served from the metadata cache.
    Cache,
    /// Fetched from Birdeye during this call.
    Fetched,
}

/// Cache-first, coalescing, pacer-throttled metadata lookups.
pub struct MetadataFetcher {
    cache: Arc<TtlCache<TokenMetadata>>,
    pacer: Arc<BirdeyePacer>,
    client: Arc<BirdeyeClient>,
    pending: Arc<Mutex<HashMap<String, SharedFetch>>>,
}

impl MetadataFetcher {
    #[must_use]
    pub fn new(
        cache: Arc<TtlCache<TokenMetadata>>,
        pacer: Arc<BirdeyePacer>,
        client: Arc<BirdeyeClient>,
    ) -> Self {
        Self { cache, pacer, client, pending: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Resolves metadata for a coin type, or `None` when no source has it.
    pub async fn get(&self, coin_type: &str) -> Option<(TokenMetadata, MetadataOrigin)> {
        if let Some(cached) = self.cache.get(coin_type) {
            return Some((cached, MetadataOrigin::Cache));
        }

        let fetch = self.join_or_start_fetch(coin_type);
        fetch.await.map(|meta| (meta, MetadataOrigin::Fetched))
    }

    /// Number of fetches currently in flight. Exposed for tests and health
    /// reporting.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn join_or_start_fetch(&self, coin_type: &str) -> SharedFetch {
        let mut pending = self.pending.lock();
        if let Some(existing) = pending.get(coin_type) {
            debug!(coin_type, "joining in-flight metadata fetch");
            return existing.clone();
        }

        let fetch = self.spawn_fetch(coin_type.to_string());
        pending.insert(coin_type.to_string(), fetch.clone());
        fetch
    }

    fn spawn_fetch(&self, coin_type: String) -> SharedFetch {
        let cache = Arc::clone(&self.cache);
        let client = Arc::clone(&self.client);
        let pacer = Arc::clone(&self.pacer);

        let fetch_coin = coin_type.clone();
        let fetch: FetchFuture = async move {
            let lookup = {
                let coin = fetch_coin.clone();
                let client = Arc::clone(&client);
                pacer.schedule(async move { client.fetch(&coin).await })
            };
            match lookup.await {
                Ok(Ok(Some(raw))) => {
                    let meta = normalize(&fetch_coin, raw);
                    cache.insert(fetch_coin, meta.clone());
                    Some(meta)
                }
                Ok(Ok(None)) => None,
                Ok(Err(e)) => {
                    warn!(coin_type = %fetch_coin, error = %e, "metadata lookup failed");
                    None
                }
                Err(closed) => {
                    warn!(coin_type = %fetch_coin, error = %closed, "metadata pacer unavailable");
                    None
                }
            }
        }
        .boxed();
        let fetch = fetch.shared();

        // A detached driver guarantees the fetch settles (and deregisters
        // itself) even if every caller disconnects mid-flight.
        let driver = fetch.clone();
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            let _ = driver.await;
            pending.lock().remove(&coin_type);
        });

        fetch
    }
}

/// Fills the gaps Birdeye leaves: decimals default to 9, symbol and name to
/// the trailing path segment of the coin type, and the description to a
/// generic marker.
fn normalize(coin_type: &str, raw: RawTokenMetadata) -> TokenMetadata {
    let tail = trailing_segment(coin_type);
    TokenMetadata {
        decimals: raw.decimals.unwrap_or(9),
        symbol: raw.symbol.filter(|s| !s.is_empty()).unwrap_or_else(|| tail.clone()),
        name: raw.name.filter(|n| !n.is_empty()).unwrap_or(tail),
        description: raw
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Token from Birdeye API".to_string()),
    }
}
