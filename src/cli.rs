//! Command-line interface parsing for the market ticker
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the `MarketConfig` the service is built from.

use clap::Parser;
use std::time::Duration;
use thiserror::Error;

use crate::config::MarketConfig;
use crate::data::{Direction, MarketQuote};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A symbol argument was empty or whitespace
    #[error("Invalid symbol: '{0}'. Symbols must be non-empty (e.g. ^JKSE, IDR=X, BTC-USD, GC=F)")]
    InvalidSymbol(String),

    /// A duration flag was zero
    #[error("Invalid value for --{0}: must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Market Pulse - cached market quotes for the landing page ticker
#[derive(Parser, Debug)]
#[command(name = "market-pulse")]
#[command(about = "Cached, coalesced market quotes (index, FX, crypto, gold)")]
#[command(version)]
pub struct Cli {
    /// Symbols to quote, in display order
    ///
    /// Defaults to ^JKSE IDR=X BTC-USD GC=F when omitted.
    #[arg(value_name = "SYMBOL")]
    pub symbols: Vec<String>,

    /// Cache time-to-live in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub ttl: u64,

    /// Per-symbol upstream timeout in milliseconds
    #[arg(long = "timeout-ms", value_name = "MS", default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Re-render every SECS seconds until Ctrl-C
    #[arg(long, value_name = "SECS")]
    pub watch: Option<u64>,

    /// Print quotes as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Evict expired cache entries every SECS seconds
    #[arg(long, value_name = "SECS")]
    pub sweep: Option<u64>,

    /// Override the quote provider chart endpoint
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Service configuration
    pub market: MarketConfig,
    /// Symbols requested on the command line (empty means defaults)
    pub symbols: Vec<String>,
    /// Re-render interval, if watching
    pub watch: Option<Duration>,
    /// Whether to print JSON
    pub json: bool,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a symbol is blank or a duration is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if let Some(blank) = cli.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(CliError::InvalidSymbol(blank.clone()));
        }

        let ttl = positive_duration(Duration::from_secs(cli.ttl), "ttl")?;
        let timeout = positive_duration(Duration::from_millis(cli.timeout_ms), "timeout-ms")?;
        let watch = cli
            .watch
            .map(|secs| positive_duration(Duration::from_secs(secs), "watch"))
            .transpose()?;
        let sweep = cli
            .sweep
            .map(|secs| positive_duration(Duration::from_secs(secs), "sweep"))
            .transpose()?;

        let mut market = MarketConfig::default().with_ttl(ttl).with_timeout(timeout);
        if let Some(url) = &cli.base_url {
            market = market.with_base_url(url.clone());
        }
        if let Some(interval) = sweep {
            market = market.with_sweep_interval(interval);
        }

        Ok(StartupConfig {
            market,
            symbols: cli.symbols.iter().map(|s| s.trim().to_string()).collect(),
            watch,
            json: cli.json,
        })
    }
}

fn positive_duration(duration: Duration, flag: &'static str) -> Result<Duration, CliError> {
    if duration.is_zero() {
        Err(CliError::ZeroDuration(flag))
    } else {
        Ok(duration)
    }
}

/// Formats one quote as a fixed-width ticker line
pub fn format_quote_line(quote: &MarketQuote) -> String {
    let arrow = match quote.direction {
        Direction::Positive => "▲",
        Direction::Negative => "▼",
    };
    let marker = if quote.is_fallback { " (offline)" } else { "" };

    format!(
        "{:<20} {:<10} {:>14} {} {:>8}{}",
        quote.name, quote.symbol, quote.value, arrow, quote.change, marker
    )
}
