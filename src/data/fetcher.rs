//! Single-symbol fetch with a deadline and fallback
//!
//! `QuoteFetcher::fetch_one` never fails: a timeout, transport error, bad
//! status or malformed body all turn into the symbol's fallback quote.

use log::warn;
use std::sync::Arc;
use std::time::Duration;

use super::{fallback_quote, MarketQuote, QuoteError, QuoteProvider};

/// Races provider lookups against a per-symbol timeout
#[derive(Clone)]
pub struct QuoteFetcher {
    provider: Arc<dyn QuoteProvider>,
    timeout: Duration,
}

impl QuoteFetcher {
    pub fn new(provider: Arc<dyn QuoteProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches a live quote, or reports why none is available
    ///
    /// When the deadline passes first, the provider future is dropped, which
    /// aborts its in-flight request.
    pub async fn try_fetch(&self, symbol: &str) -> Result<MarketQuote, QuoteError> {
        match tokio::time::timeout(self.timeout, self.provider.fetch_quote(symbol)).await {
            Ok(result) => result,
            Err(_) => Err(QuoteError::Timeout(self.timeout)),
        }
    }

    /// Fetches a quote for `symbol`, substituting the fallback on any failure
    pub async fn fetch_one(&self, symbol: &str) -> MarketQuote {
        match self.try_fetch(symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("using fallback quote for {}: {}", symbol, e);
                fallback_quote(symbol)
            }
        }
    }
}
