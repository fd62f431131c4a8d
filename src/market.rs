//! Market data service for the landing page widget
//!
//! `MarketData` is the one entry point page-rendering code calls. It resolves a
//! symbol list to quotes through the coalescing cache, fanning out one
//! fetch per symbol on a miss and keeping the caller's order.

use futures::future::join_all;
use log::{debug, warn};
use std::convert::Infallible;
use std::sync::Arc;

use crate::cache::CacheManager;
use crate::config::MarketConfig;
use crate::data::{fallback_quote, MarketQuote, QuoteError, QuoteFetcher, QuoteProvider, YahooClient};
use crate::sweeper::SweepHandle;

/// Prefix for cache keys built from symbol lists
const CACHE_KEY_PREFIX: &str = "market_data";

/// Cached, coalesced access to market quotes
///
/// Build one at startup and clone it into whatever serves pages; clones share
/// the same cache and in-flight set.
#[derive(Clone)]
pub struct MarketData {
    cache: CacheManager<Vec<MarketQuote>>,
    fetcher: QuoteFetcher,
    default_symbols: Arc<Vec<String>>,
}

impl MarketData {
    /// Creates the service backed by the Yahoo chart API at `config.base_url`
    pub fn new(config: &MarketConfig) -> Result<Self, QuoteError> {
        let provider = YahooClient::new(config.base_url.clone(), config.timeout)?;
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Creates the service with a custom quote provider
    pub fn with_provider(config: &MarketConfig, provider: Arc<dyn QuoteProvider>) -> Self {
        Self {
            cache: CacheManager::new(config.ttl),
            fetcher: QuoteFetcher::new(provider, config.timeout),
            default_symbols: Arc::new(config.symbols.clone()),
        }
    }

    pub fn cache(&self) -> &CacheManager<Vec<MarketQuote>> {
        &self.cache
    }

    pub fn default_symbols(&self) -> &[String] {
        &self.default_symbols
    }

    /// Starts periodic eviction of expired entries from this service's cache
    pub fn spawn_sweeper(&self, interval: std::time::Duration) -> SweepHandle {
        SweepHandle::spawn(self.cache.store().clone(), interval)
    }

    /// Cache key for an ordered symbol list
    ///
    /// Each symbol is length-prefixed (`5:^JKSE`), so no two distinct lists
    /// share a key even when a symbol contains the separator.
    pub fn cache_key<S: AsRef<str>>(symbols: &[S]) -> String {
        let segments: Vec<String> = symbols
            .iter()
            .map(|symbol| {
                let symbol = symbol.as_ref();
                format!("{}:{}", symbol.len(), symbol)
            })
            .collect();
        format!("{}:{}", CACHE_KEY_PREFIX, segments.join(","))
    }

    /// Quotes for the default symbol set
    pub async fn get_default_market_data(&self) -> Vec<MarketQuote> {
        let symbols = Arc::clone(&self.default_symbols);
        self.get_market_data(symbols.as_slice()).await
    }

    /// Quotes for `symbols`, in the same order and of the same length
    ///
    /// An empty list means the default symbol set. Fresh cached results are
    /// returned immediately; otherwise one fetch per symbol runs concurrently,
    /// shared with any other caller asking for the same list. This never
    /// fails: unavailable symbols come back as fallback quotes.
    pub async fn get_market_data<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<MarketQuote> {
        let requested: Vec<String> = if symbols.is_empty() {
            self.default_symbols.to_vec()
        } else {
            symbols.iter().map(|s| s.as_ref().to_string()).collect()
        };

        let key = Self::cache_key(&requested);
        let fetcher = self.fetcher.clone();
        let to_fetch = requested.clone();

        let result = self
            .cache
            .get_or_set(&key, move || async move {
                Ok::<_, Infallible>(fetch_quotes(&fetcher, &to_fetch).await)
            })
            .await;

        match result {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("market data producer failed, serving fallbacks: {}", e);
                requested.iter().map(|symbol| fallback_quote(symbol)).collect()
            }
        }
    }
}

/// Fetches every symbol concurrently; output order matches `symbols`
async fn fetch_quotes(fetcher: &QuoteFetcher, symbols: &[String]) -> Vec<MarketQuote> {
    debug!("fetching {} symbols: {}", symbols.len(), symbols.join(","));
    join_all(symbols.iter().map(|symbol| fetcher.fetch_one(symbol))).await
}
