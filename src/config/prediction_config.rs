//! Prediction and top-pick configuration parsing from environment variables.

use super::{Lookup, parse_bool, parse_opt, parse_or};
use crate::application::prediction::{
    DailyWindow, HeuristicTable, MarketCapBand, PredictionSettings, TopPicksConfig,
};
use crate::domain::market::timeframe::Timeframe;
use anyhow::{Context, Result, ensure};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PredictionEnvConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub timeframes: Vec<Timeframe>,
    pub candle_limit: usize,
    pub min_history: usize,
    pub daily_window_hour: u32,
    pub daily_window_minutes: u32,
    /// Optional TOML override for the heuristic magnitude/confidence table
    pub table_path: Option<PathBuf>,
    pub top_picks_limit: usize,
    pub min_market_cap: f64,
    pub max_market_cap: Option<f64>,
    pub require_market_cap: bool,
    /// `symbol,market_cap` CSV seeding the market-cap band; without it every
    /// cap is unknown
    pub market_caps_path: Option<PathBuf>,
}

fn parse_timeframes(raw: &str) -> Result<Vec<Timeframe>> {
    let mut timeframes = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let tf = Timeframe::from_str(part).context("Failed to parse PREDICTION_TIMEFRAMES")?;
        if !timeframes.contains(&tf) {
            timeframes.push(tf);
        }
    }
    ensure!(!timeframes.is_empty(), "PREDICTION_TIMEFRAMES must name at least one timeframe");
    Ok(timeframes)
}

impl PredictionEnvConfig {
    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let timeframes = parse_timeframes(
            &lookup("PREDICTION_TIMEFRAMES").unwrap_or_else(|| "1h,4h,1d".to_string()),
        )?;

        let config = Self {
            enabled: parse_bool(lookup, "PREDICTION_ENABLED", true),
            interval_secs: parse_or(lookup, "PREDICTION_INTERVAL_SECS", 60)?,
            timeframes,
            candle_limit: parse_or(lookup, "CANDLE_LIMIT", 100)?,
            min_history: parse_or(lookup, "MIN_HISTORY", 50)?,
            daily_window_hour: parse_or(lookup, "DAILY_WINDOW_HOUR", 0)?,
            daily_window_minutes: parse_or(lookup, "DAILY_WINDOW_MINUTES", 10)?,
            table_path: lookup("PREDICTION_TABLE_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            top_picks_limit: parse_or(lookup, "TOP_PICKS_LIMIT", 10)?,
            min_market_cap: parse_or(lookup, "TOP_PICKS_MIN_MARKET_CAP", 0.0)?,
            max_market_cap: parse_opt(lookup, "TOP_PICKS_MAX_MARKET_CAP")?,
            require_market_cap: parse_bool(lookup, "TOP_PICKS_REQUIRE_MARKET_CAP", false),
            market_caps_path: lookup("TOP_PICKS_MARKET_CAPS_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };

        ensure!(config.interval_secs > 0, "PREDICTION_INTERVAL_SECS must be at least 1");
        ensure!(config.daily_window_hour < 24, "DAILY_WINDOW_HOUR must be in 0..=23");
        ensure!(
            config.daily_window_minutes > 0,
            "DAILY_WINDOW_MINUTES must be at least 1, daily predictions would never run"
        );
        ensure!(
            config.daily_window_minutes <= (24 - config.daily_window_hour) * 60,
            "Daily window starting at {:02}:00 UTC cannot run past midnight ({} minutes)",
            config.daily_window_hour,
            config.daily_window_minutes
        );
        ensure!(
            config.min_history <= config.candle_limit,
            "MIN_HISTORY ({}) cannot exceed CANDLE_LIMIT ({})",
            config.min_history,
            config.candle_limit
        );
        if let Some(max) = config.max_market_cap {
            ensure!(
                max >= config.min_market_cap,
                "TOP_PICKS_MAX_MARKET_CAP ({}) is below TOP_PICKS_MIN_MARKET_CAP ({})",
                max,
                config.min_market_cap
            );
        }

        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn settings(&self) -> PredictionSettings {
        PredictionSettings {
            timeframes: self.timeframes.clone(),
            candle_limit: self.candle_limit,
            min_history: self.min_history,
        }
    }

    pub fn daily_window(&self) -> DailyWindow {
        DailyWindow {
            hour_utc: self.daily_window_hour,
            window_minutes: self.daily_window_minutes,
        }
    }

    pub fn top_picks(&self) -> TopPicksConfig {
        TopPicksConfig {
            band: MarketCapBand {
                min: self.min_market_cap,
                max: self.max_market_cap,
                require_known: self.require_market_cap,
            },
            top_k: self.top_picks_limit,
            timeframes: self.timeframes.clone(),
            ..TopPicksConfig::default()
        }
    }

    /// Built-in table unless a TOML override is configured
    pub fn heuristic_table(&self) -> Result<HeuristicTable> {
        match &self.table_path {
            Some(path) => HeuristicTable::from_file(path),
            None => Ok(HeuristicTable::default()),
        }
    }
}
