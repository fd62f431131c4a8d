//! Market Pulse Library
//!
//! Data-freshness layer for the landing page market widget: a TTL cache with
//! request coalescing in front of a timeout-raced, fallback-backed quote fetcher.
//!
//! ```no_run
//! use market_pulse::{MarketConfig, MarketData};
//!
//! # async fn render() -> Result<(), market_pulse::data::QuoteError> {
//! let market = MarketData::new(&MarketConfig::default())?;
//! let quotes = market.get_default_market_data().await;
//! assert_eq!(quotes.len(), 4);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod market;
pub mod sweeper;

pub use cache::{CacheError, CacheManager, CacheStore};
pub use config::MarketConfig;
pub use data::{Direction, MarketQuote};
pub use market::MarketData;
pub use sweeper::SweepHandle;
