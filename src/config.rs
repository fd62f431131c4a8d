//! Configuration for the market data layer
//!
//! Holds the cache TTL, per-symbol upstream timeout, default symbol set and
//! the quote provider endpoint. Defaults match what the landing page expects.

use std::time::Duration;

/// Base URL for the Yahoo Finance chart API
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// How long an assembled quote list stays fresh
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Per-symbol deadline for the upstream call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Symbols shown when the caller does not ask for any: index, FX pair, crypto, gold
pub const DEFAULT_SYMBOLS: [&str; 4] = ["^JKSE", "IDR=X", "BTC-USD", "GC=F"];

/// Configuration for the market data service
#[derive(Debug, Clone, PartialEq)]
pub struct MarketConfig {
    /// Time-to-live for cached quote lists
    pub ttl: Duration,
    /// Deadline for each upstream symbol lookup
    pub timeout: Duration,
    /// Symbols substituted when a request names none
    pub symbols: Vec<String>,
    /// Chart endpoint of the quote provider
    pub base_url: String,
    /// Interval of the background eviction task, if enabled
    pub sweep_interval: Option<Duration>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            timeout: DEFAULT_TIMEOUT,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            base_url: DEFAULT_BASE_URL.to_string(),
            sweep_interval: None,
        }
    }
}

impl MarketConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enables periodic eviction of expired cache entries
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }
}
