//! Core data models for market quotes
//!
//! This module contains the quote type handed to page-rendering code, the
//! provider client, the timeout/fallback fetcher, and the static fallback table.

pub mod fallback;
pub mod fetcher;
pub mod provider;

pub use fallback::{fallback_quote, get_fallback_by_symbol, FallbackQuote};
pub use fetcher::QuoteFetcher;
pub use provider::{ChartMeta, ChartResponse, QuoteError, QuoteProvider, YahooClient};

use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

/// Whether a quote moved up (or stayed flat) or down since the previous close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// Flat counts as positive
    pub fn from_change(change: f64) -> Self {
        if change >= 0.0 {
            Direction::Positive
        } else {
            Direction::Negative
        }
    }
}

/// A quote ready for display in the market widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    /// Human-readable name (e.g., "IHSG", "Bitcoin")
    pub name: String,
    /// Provider ticker symbol (e.g., "^JKSE")
    pub symbol: String,
    /// Formatted price (e.g., "7,234.56")
    pub value: String,
    /// Signed percentage change (e.g., "+1.20%")
    pub change: String,
    /// Raw percentage change
    pub change_percent: f64,
    /// Up or down since previous close
    pub direction: Direction,
    /// Whether this quote came from the fallback table rather than the provider
    pub is_fallback: bool,
    /// When this quote was produced
    pub fetched_at: DateTime<Utc>,
}

impl MarketQuote {
    /// Builds a live quote from the current price and previous close
    ///
    /// `previous_close` must be non-zero; the provider module rejects
    /// responses where it is not.
    pub fn from_prices(
        name: impl Into<String>,
        symbol: impl Into<String>,
        price: f64,
        previous_close: f64,
    ) -> Self {
        let change = price - previous_close;
        let change_percent = change / previous_close * 100.0;

        Self {
            name: name.into(),
            symbol: symbol.into(),
            value: format_value(price),
            change: format_change(change_percent),
            change_percent,
            direction: Direction::from_change(change),
            is_fallback: false,
            fetched_at: Utc::now(),
        }
    }

    /// Builds a substitute quote from static values
    pub fn fallback(
        name: impl Into<String>,
        symbol: impl Into<String>,
        price: f64,
        change_percent: f64,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            value: format_value(price),
            change: format_change(change_percent),
            change_percent,
            direction: Direction::from_change(change_percent),
            is_fallback: true,
            fetched_at: Utc::now(),
        }
    }
}

/// Largest magnitude formatted with grouping; below it cents are exact in `f64`
const MAX_GROUPED_VALUE: f64 = 1e13;

/// Formats a price with thousands separators and two decimals (e.g., "65,432.10")
///
/// Magnitudes of `MAX_GROUPED_VALUE` and above are printed ungrouped rather
/// than truncated.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }
    if value.abs() >= MAX_GROUPED_VALUE {
        return format!("{:.2}", value);
    }

    let cents = (value.abs() * 100.0).round() as i64;
    let whole = (cents / 100).to_formatted_string(&Locale::en);
    let sign = if value < 0.0 && cents != 0 { "-" } else { "" };

    format!("{}{}.{:02}", sign, whole, cents % 100)
}

/// Formats a percentage change with an explicit sign (e.g., "+1.20%", "-0.35%")
pub fn format_change(change_percent: f64) -> String {
    let rounded = (change_percent * 100.0).round() / 100.0;
    // Avoid "-0.00%"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:+.2}%", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_groups_thousands() {
        assert_eq!(format_value(7234.567), "7,234.57");
        assert_eq!(format_value(65432.1), "65,432.10");
        assert_eq!(format_value(1_234_567.0), "1,234,567.00");
        assert_eq!(format_value(15.5), "15.50");
        assert_eq!(format_value(0.0), "0.00");
    }

    #[test]
    fn test_format_value_negative_and_non_finite() {
        assert_eq!(format_value(-1234.5), "-1,234.50");
        assert_eq!(format_value(-0.001), "0.00");
        assert_eq!(format_value(f64::NAN), "0.00");
    }

    #[test]
    fn test_format_value_huge_prices_are_not_truncated() {
        assert_eq!(format_value(9_999_999_999_999.0), "9,999,999,999,999.00");
        assert_eq!(format_value(1e17), "100000000000000000.00");
        assert_eq!(format_value(-1e20), "-100000000000000000000.00");
    }

    #[test]
    fn test_format_change_is_signed() {
        assert_eq!(format_change(1.2), "+1.20%");
        assert_eq!(format_change(-0.354), "-0.35%");
        assert_eq!(format_change(0.0), "+0.00%");
        assert_eq!(format_change(-0.001), "+0.00%");
    }

    #[test]
    fn test_from_prices_positive_move() {
        let quote = MarketQuote::from_prices("Gold", "GC=F", 2400.0, 2350.0);

        assert_eq!(quote.value, "2,400.00");
        assert_eq!(quote.change, "+2.13%");
        assert!((quote.change_percent - 2.1276).abs() < 0.01);
        assert_eq!(quote.direction, Direction::Positive);
        assert!(!quote.is_fallback);
    }

    #[test]
    fn test_from_prices_negative_move() {
        let quote = MarketQuote::from_prices("IHSG", "^JKSE", 7100.0, 7200.0);

        assert_eq!(quote.change, "-1.39%");
        assert_eq!(quote.direction, Direction::Negative);
    }

    #[test]
    fn test_from_prices_flat_is_positive() {
        let quote = MarketQuote::from_prices("USD/IDR", "IDR=X", 15750.0, 15750.0);

        assert_eq!(quote.change, "+0.00%");
        assert_eq!(quote.direction, Direction::Positive);
    }

    #[test]
    fn test_market_quote_serializes_camel_case() {
        let quote = MarketQuote::from_prices("Bitcoin", "BTC-USD", 66000.0, 65000.0);
        let json = serde_json::to_value(&quote).expect("Failed to serialize MarketQuote");

        assert_eq!(json["name"], "Bitcoin");
        assert_eq!(json["changePercent"].as_f64().map(|v| v > 1.5), Some(true));
        assert_eq!(json["direction"], "positive");
        assert_eq!(json["isFallback"], false);
        assert!(json.get("fetchedAt").is_some());
    }
}
