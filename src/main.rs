//! Market Pulse - terminal ticker over the cached market data service
//!
//! Prints the landing page quotes (index, FX, crypto, gold) once, or keeps
//! re-rendering them with `--watch`. Every render goes through the same
//! cache, so renders inside the TTL window do not touch the provider.

use std::process;

use clap::Parser;
use log::info;

use market_pulse::cli::{format_quote_line, Cli, StartupConfig};
use market_pulse::MarketData;

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Fetches and prints one round of quotes
async fn render(market: &MarketData, startup: &StartupConfig) -> Result<(), Box<dyn std::error::Error>> {
    let quotes = market.get_market_data(startup.symbols.as_slice()).await;

    if startup.json {
        println!("{}", serde_json::to_string_pretty(&quotes)?);
    } else {
        for quote in &quotes {
            println!("{}", format_quote_line(quote));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let cli = Cli::parse();
    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    let market = MarketData::new(&startup.market)?;
    let sweeper = startup
        .market
        .sweep_interval
        .map(|interval| market.spawn_sweeper(interval));

    render(&market, &startup).await?;

    if let Some(every) = startup.watch {
        info!("refreshing every {:?}, Ctrl-C to stop", every);
        let mut ticker = tokio::time::interval(every);
        // Skip the first tick (immediate)
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    println!();
                    render(&market, &startup).await?;
                }
                _ = tokio::signal::ctrl_c() => {
                    break;
                }
            }
        }
    }

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    Ok(())
}
