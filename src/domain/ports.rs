use crate::domain::errors::ServiceError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::market::trading_pair::{InstrumentInfo, TickerSnapshot};
use async_trait::async_trait;

/// Read-only exchange REST boundary
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Instrument catalog (symbol, assets, status)
    async fn fetch_instruments(&self) -> Result<Vec<InstrumentInfo>, ServiceError>;

    /// Rolling 24h ticker for every symbol
    async fn fetch_tickers(&self) -> Result<Vec<TickerSnapshot>, ServiceError>;
}

/// Source of chronological OHLCV history
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Returns at most `limit` of the most recent candles, oldest first
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ServiceError>;
}
