//! Static fallback quotes
//!
//! Last-known-good values shown when the quote provider is slow or failing.
//! Unknown symbols fall back to a zero-valued quote.

use super::MarketQuote;

/// A fallback entry for a known symbol
#[derive(Debug, Clone, Copy)]
pub struct FallbackQuote {
    /// Ticker symbol as understood by the provider
    pub symbol: &'static str,
    /// Display name
    pub name: &'static str,
    /// Last known price
    pub price: f64,
    /// Last known percentage change
    pub change_percent: f64,
}

/// Fallback values for the default landing page symbols
pub static FALLBACK_QUOTES: [FallbackQuote; 4] = [
    FallbackQuote {
        symbol: "^JKSE",
        name: "IHSG",
        price: 7_250.00,
        change_percent: 0.0,
    },
    FallbackQuote {
        symbol: "IDR=X",
        name: "USD/IDR",
        price: 15_750.00,
        change_percent: 0.0,
    },
    FallbackQuote {
        symbol: "BTC-USD",
        name: "Bitcoin",
        price: 65_000.00,
        change_percent: 0.0,
    },
    FallbackQuote {
        symbol: "GC=F",
        name: "Gold",
        price: 2_350.00,
        change_percent: 0.0,
    },
];

/// Get the fallback entry for a symbol, if one is known
pub fn get_fallback_by_symbol(symbol: &str) -> Option<&'static FallbackQuote> {
    FALLBACK_QUOTES.iter().find(|entry| entry.symbol == symbol)
}

/// Display name for a symbol: the table name if known, else the symbol itself
pub fn display_name(symbol: &str) -> String {
    get_fallback_by_symbol(symbol)
        .map(|entry| entry.name.to_string())
        .unwrap_or_else(|| symbol.to_string())
}

/// Builds the fallback quote for `symbol`
pub fn fallback_quote(symbol: &str) -> MarketQuote {
    match get_fallback_by_symbol(symbol) {
        Some(entry) => MarketQuote::fallback(entry.name, symbol, entry.price, entry.change_percent),
        None => MarketQuote::fallback(symbol, symbol, 0.0, 0.0),
    }
}
