//! MarketPulse - crypto market watcher and heuristic predictor
//!
//! Keeps a filtered snapshot of liquid trading pairs, scores their candle
//! history on several timeframes and ranks the results into top picks.
//! Metrics are pushed via structured JSON logs to stdout.
//!
//! # Usage
//! ```sh
//! EXCHANGE_MODE=mock cargo run -- --once
//! cargo run -- --history-csv data/candles.csv
//! ```

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use marketpulse::application::system::Application;
use marketpulse::config::Config;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "marketpulse", version, about = "Market watcher and heuristic predictor")]
struct Args {
    /// Run a single refresh and prediction pass, print the top picks and exit
    #[arg(long)]
    once: bool,

    /// Read candle history from a CSV file instead of the exchange
    #[arg(long, value_name = "PATH")]
    history_csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("MarketPulse {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Exchange={:?}, Quote={}, Timeframes={:?}",
        config.exchange.mode, config.exchange.quote_currency, config.prediction.timeframes
    );

    let app = Application::build(config, args.history_csv.as_deref()).await?;

    if args.once {
        let summary = app.run_once(Utc::now()).await;
        for report in &summary.reports {
            info!(
                "{}: {} generated, {} skipped, {} failed",
                report.timeframe,
                report.generated.len(),
                report.skipped,
                report.failed
            );
        }
        println!("{}", serde_json::to_string_pretty(&summary.top_picks)?);
        return Ok(());
    }

    let handle = app.start();
    info!("MarketPulse running. Press Ctrl+C to shutdown.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Stopping background tasks...");
    handle.shutdown();

    Ok(())
}
