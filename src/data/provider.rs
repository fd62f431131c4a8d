//! Yahoo Finance chart API client
//!
//! This module provides the `QuoteProvider` trait the fetcher talks to, and
//! `YahooClient`, which fetches a symbol's chart metadata over HTTP and parses
//! it into a `MarketQuote`.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::{fallback, MarketQuote};
use crate::config::DEFAULT_BASE_URL;

/// Browser-like agent; the chart endpoint rejects requests without one
const USER_AGENT: &str = "Mozilla/5.0 (compatible; market-pulse/0.1)";

/// Errors that can occur when fetching a quote
#[derive(Debug, Error)]
pub enum QuoteError {
    /// The provider did not answer within the deadline
    #[error("Upstream timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP request failed (connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Upstream returned HTTP {0}")]
    HttpStatus(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// A field was present but unusable
    #[error("Invalid value in response: {0}")]
    InvalidValue(String),

    /// The configured endpoint could not be turned into a request URL
    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),
}

/// Source of live quotes
///
/// `YahooClient` is the production implementation; anything that can turn a
/// symbol into a quote can stand in for it.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<MarketQuote, QuoteError>;
}

/// Chart API response structure
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

/// The `chart` object; `result` is null when the symbol is unknown
#[derive(Debug, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
}

/// The subset of chart metadata the widget needs
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub short_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub chart_previous_close: Option<f64>,
}

/// Client for fetching quotes from the Yahoo Finance chart API
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a client for `base_url` whose requests give up after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, QuoteError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a client with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Create a client for the public Yahoo endpoint
    pub fn with_default_url(timeout: Duration) -> Result<Self, QuoteError> {
        Self::new(DEFAULT_BASE_URL, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `{base_url}/{symbol}?interval=1d&range=1d` with the symbol escaped
    fn chart_url(&self, symbol: &str) -> Result<Url, QuoteError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| QuoteError::InvalidUrl(e.to_string()))?;

        url.path_segments_mut()
            .map_err(|_| QuoteError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("interval", "1d")
            .append_pair("range", "1d");

        Ok(url)
    }
}

#[async_trait]
impl QuoteProvider for YahooClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<MarketQuote, QuoteError> {
        let url = self.chart_url(symbol)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::HttpStatus(status.as_u16()));
        }

        let text = response.text().await?;
        let chart: ChartResponse = serde_json::from_str(&text)?;

        parse_chart(symbol, chart)
    }
}

/// Parse a chart response into a `MarketQuote`
///
/// Requires `chart.result[0].meta` with a finite `regularMarketPrice` and a
/// finite, non-zero previous close (`previousClose`, else `chartPreviousClose`).
/// A missing `shortName` falls back to the static display name.
pub fn parse_chart(symbol: &str, response: ChartResponse) -> Result<MarketQuote, QuoteError> {
    let meta = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|result| result.meta)
        .ok_or_else(|| QuoteError::MissingField("chart.result[0]".to_string()))?;

    let price = meta
        .regular_market_price
        .ok_or_else(|| QuoteError::MissingField("meta.regularMarketPrice".to_string()))?;
    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .ok_or_else(|| QuoteError::MissingField("meta.previousClose".to_string()))?;

    if !price.is_finite() {
        return Err(QuoteError::InvalidValue(format!(
            "regularMarketPrice = {}",
            price
        )));
    }
    if !previous_close.is_finite() || previous_close == 0.0 {
        return Err(QuoteError::InvalidValue(format!(
            "previousClose = {}",
            previous_close
        )));
    }

    let name = meta
        .short_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| fallback::display_name(symbol));

    let quote = MarketQuote::from_prices(name, symbol, price, previous_close);
    if !quote.change_percent.is_finite() {
        return Err(QuoteError::InvalidValue(format!(
            "change from {} to {} is not a finite percentage",
            previous_close, price
        )));
    }

    Ok(quote)
}
