//! Market Data Fetcher
//!
//! Pulls the instrument catalog and the 24h ticker in parallel, joins them by
//! symbol and keeps the liquid, tradeable pairs quoted in the configured
//! currency. A failure of either retrieval fails the whole fetch so callers
//! never see a half-joined result.

use crate::application::market_data::pair_signals::PairSignalEstimator;
use crate::domain::errors::ServiceError;
use crate::domain::market::trading_pair::{InstrumentInfo, TickerSnapshot, TradingPair};
use crate::domain::ports::ExchangeGateway;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Universe selection rules
#[derive(Debug, Clone, PartialEq)]
pub struct PairFilter {
    pub quote_currency: String,
    /// Liquidity floor on 24h quote volume
    pub min_quote_volume: f64,
    /// Cap on the number of pairs kept after sorting by volume
    pub max_pairs: usize,
}

impl Default for PairFilter {
    fn default() -> Self {
        Self {
            quote_currency: "USDT".to_string(),
            min_quote_volume: 1_000_000.0,
            max_pairs: 100,
        }
    }
}

pub struct MarketDataFetcher {
    gateway: Arc<dyn ExchangeGateway>,
    estimator: Arc<dyn PairSignalEstimator>,
    filter: PairFilter,
}

impl MarketDataFetcher {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        estimator: Arc<dyn PairSignalEstimator>,
        filter: PairFilter,
    ) -> Self {
        Self {
            gateway,
            estimator,
            filter,
        }
    }

    pub fn filter(&self) -> &PairFilter {
        &self.filter
    }

    pub async fn fetch(&self) -> Result<Vec<TradingPair>, ServiceError> {
        let (instruments, tickers) = tokio::try_join!(
            self.gateway.fetch_instruments(),
            self.gateway.fetch_tickers()
        )?;

        debug!(
            "MarketDataFetcher: Received {} instruments and {} tickers",
            instruments.len(),
            tickers.len()
        );

        let now_ms = chrono::Utc::now().timestamp_millis();
        let pairs = build_trading_pairs(
            &instruments,
            &tickers,
            &self.filter,
            self.estimator.as_ref(),
            now_ms,
        );

        info!(
            "MarketDataFetcher: {} {} pairs passed filters",
            pairs.len(),
            self.filter.quote_currency
        );

        Ok(pairs)
    }
}

/// Join, filter, sort by 24h volume (descending) and truncate.
///
/// Tickers with unparsable numbers or a non-positive price are dropped.
pub fn build_trading_pairs(
    instruments: &[InstrumentInfo],
    tickers: &[TickerSnapshot],
    filter: &PairFilter,
    estimator: &dyn PairSignalEstimator,
    now_ms: i64,
) -> Vec<TradingPair> {
    let catalog: HashMap<&str, &InstrumentInfo> = instruments
        .iter()
        .filter(|i| i.quote_asset == filter.quote_currency && i.is_tradeable())
        .map(|i| (i.symbol.as_str(), i))
        .collect();

    let mut pairs: Vec<TradingPair> = tickers
        .iter()
        .filter_map(|ticker| {
            let instrument = catalog.get(ticker.symbol.as_str())?;
            let stats = ticker.parse_stats()?;

            if stats.price <= 0.0 || stats.quote_volume < filter.min_quote_volume {
                return None;
            }

            let signals = estimator.estimate(&ticker.symbol, &stats);

            Some(TradingPair {
                symbol: ticker.symbol.clone(),
                base_asset: instrument.base_asset.clone(),
                quote_asset: instrument.quote_asset.clone(),
                price: stats.price,
                price_change_24h: stats.price_change_pct,
                volume_24h: stats.quote_volume,
                market_cap: None,
                order_book_imbalance: signals.order_book_imbalance,
                price_velocity: signals.price_velocity,
                velocity_trend: signals.velocity_trend,
                pump_probability: signals.pump_probability,
                last_updated: now_ms,
            })
        })
        .collect();

    pairs.sort_by(|a, b| {
        b.volume_24h
            .partial_cmp(&a.volume_24h)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs.truncate(filter.max_pairs);

    pairs
}
