use crate::domain::errors::ServiceError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::market::trading_pair::{InstrumentInfo, TickerSnapshot};
use crate::domain::ports::{CandleSource, ExchangeGateway};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;

/// Offline exchange with a settable catalog and ticker.
///
/// Every call is counted so tests can assert on how often the exchange was hit.
pub struct MockExchangeGateway {
    instruments: RwLock<Vec<InstrumentInfo>>,
    tickers: RwLock<Vec<TickerSnapshot>>,
    fail_tickers: AtomicBool,
    calls: AtomicUsize,
}

impl MockExchangeGateway {
    pub fn new(instruments: Vec<InstrumentInfo>, tickers: Vec<TickerSnapshot>) -> Self {
        Self {
            instruments: RwLock::new(instruments),
            tickers: RwLock::new(tickers),
            fail_tickers: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// BTC, ETH and SOL against USDT plus a few pairs the default filter rejects
    pub fn with_default_pairs() -> Self {
        let instruments = vec![
            mock_instrument("BTCUSDT", "BTC", "USDT", "TRADING"),
            mock_instrument("ETHUSDT", "ETH", "USDT", "TRADING"),
            mock_instrument("SOLUSDT", "SOL", "USDT", "TRADING"),
            mock_instrument("ETHBTC", "ETH", "BTC", "TRADING"),
            mock_instrument("LUNAUSDT", "LUNA", "USDT", "BREAK"),
            mock_instrument("PEPEUSDT", "PEPE", "USDT", "TRADING"),
        ];
        let tickers = vec![
            mock_ticker("BTCUSDT", "96000.00", "2.10", "1850000000"),
            mock_ticker("ETHUSDT", "3400.00", "-1.25", "920000000"),
            mock_ticker("SOLUSDT", "150.00", "4.80", "410000000"),
            mock_ticker("ETHBTC", "0.0354", "0.30", "3000000"),
            mock_ticker("LUNAUSDT", "0.0001", "0.00", "5000000"),
            mock_ticker("PEPEUSDT", "0.00001", "9.00", "250000"),
        ];
        Self::new(instruments, tickers)
    }

    pub fn set_tickers(&self, tickers: Vec<TickerSnapshot>) {
        let mut guard = match self.tickers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = tickers;
    }

    /// Make ticker retrieval fail with an upstream 503 until reset
    pub fn set_fail_tickers(&self, fail: bool) {
        self.fail_tickers.store(fail, Ordering::SeqCst);
    }

    /// Number of gateway calls (instruments and tickers counted separately)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeGateway for MockExchangeGateway {
    async fn fetch_instruments(&self) -> Result<Vec<InstrumentInfo>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = match self.instruments.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.clone())
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerSnapshot>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tickers.load(Ordering::SeqCst) {
            return Err(ServiceError::upstream(503, "mock exchange unavailable"));
        }
        let guard = match self.tickers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.clone())
    }
}

pub fn mock_instrument(symbol: &str, base: &str, quote: &str, status: &str) -> InstrumentInfo {
    InstrumentInfo {
        symbol: symbol.to_string(),
        base_asset: base.to_string(),
        quote_asset: quote.to_string(),
        status: status.to_string(),
        is_spot_trading_allowed: true,
    }
}

pub fn mock_ticker(symbol: &str, price: &str, change_pct: &str, quote_volume: &str) -> TickerSnapshot {
    TickerSnapshot {
        symbol: symbol.to_string(),
        last_price: price.to_string(),
        price_change_percent: change_pct.to_string(),
        quote_volume: quote_volume.to_string(),
    }
}

/// Deterministic random-walk candles with an optional per-candle drift.
///
/// The same (symbol, timeframe, limit) always yields the same series, ending
/// one timeframe before the fixed anchor time.
pub struct MockCandleSource {
    drift_pct: f64,
    anchor_ms: i64,
}

impl MockCandleSource {
    pub fn new(drift_pct: f64) -> Self {
        Self {
            drift_pct,
            // 2025-01-01T00:00:00Z
            anchor_ms: 1_735_689_600_000,
        }
    }
}

impl Default for MockCandleSource {
    fn default() -> Self {
        Self::new(0.0)
    }
}

fn base_price(symbol: &str) -> f64 {
    if symbol.contains("BTC") {
        96000.0
    } else if symbol.contains("ETH") {
        3400.0
    } else if symbol.contains("SOL") {
        150.0
    } else {
        10.0
    }
}

#[async_trait]
impl CandleSource for MockCandleSource {
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ServiceError> {
        let symbol_seed: u64 = symbol.bytes().map(u64::from).sum();
        let step_ms = timeframe.to_millis();
        let start_ms = self.anchor_ms - step_ms * limit as i64;

        let mut price = base_price(symbol);
        let mut candles = Vec::with_capacity(limit);

        for i in 0..limit {
            // Simple LCG noise in -0.5%..+0.5%
            let seed = (i as u64 + symbol_seed)
                .wrapping_mul(1_103_515_245)
                .wrapping_add(12_345);
            let noise = (((seed / 65_536) % 1000) as f64 / 1000.0 - 0.5) * 0.01;
            let open = price;
            let close = open * (1.0 + noise + self.drift_pct / 100.0);
            let high = open.max(close) * 1.002;
            let low = open.min(close) * 0.998;
            let volume = 1000.0 + ((seed / 7) % 500) as f64;
            price = close;

            candles.push(Candle {
                symbol: symbol.to_string(),
                open: to_decimal(open)?,
                high: to_decimal(high)?,
                low: to_decimal(low)?,
                close: to_decimal(close)?,
                volume: to_decimal(volume)?,
                timestamp: start_ms + step_ms * i as i64,
            });
        }

        info!(
            "MockCandleSource: Generated {} {} candles for {}",
            candles.len(),
            timeframe,
            symbol
        );
        Ok(candles)
    }
}

fn to_decimal(value: f64) -> Result<Decimal, ServiceError> {
    Decimal::from_f64(value)
        .ok_or_else(|| ServiceError::invalid_input(format!("Unrepresentable price {}", value)))
}
