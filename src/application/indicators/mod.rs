//! Indicator Engine
//!
//! Pure windowed functions over OHLCV history. Windowed indicators simply
//! start later when the input is short; none of them fail on insufficient
//! data, and a zero window yields an empty series.

pub mod moving_average;
pub mod oscillators;
pub mod volatility;

pub use moving_average::{BollingerPoint, bollinger_bands, moving_average, sma};
pub use oscillators::{MacdPoint, macd, roc, rsi};
pub use volatility::{adx, atr};

use crate::domain::market::candle::Candle;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub timestamp: i64,
    pub value: f64,
}

pub type IndicatorSeries = Vec<IndicatorPoint>;

/// Default indicator parameters
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub ma_period: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    pub roc_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_period: 20,
            bb_period: 20,
            bb_std_dev: 2.0,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            adx_period: 14,
            atr_period: 14,
            roc_period: 12,
        }
    }
}

/// Every indicator keyed by name (`ma_20`, `bb_upper`, `rsi_14`, ...)
pub fn compute_all(candles: &[Candle], params: &IndicatorParams) -> BTreeMap<String, IndicatorSeries> {
    let mut out = BTreeMap::new();

    out.insert(format!("ma_{}", params.ma_period), sma(candles, params.ma_period));

    let bands = bollinger_bands(candles, params.bb_period, params.bb_std_dev);
    let band = |f: fn(&BollingerPoint) -> f64| -> IndicatorSeries {
        bands
            .iter()
            .map(|b| IndicatorPoint {
                timestamp: b.timestamp,
                value: f(b),
            })
            .collect()
    };
    out.insert("bb_upper".to_string(), band(|b| b.upper));
    out.insert("bb_middle".to_string(), band(|b| b.middle));
    out.insert("bb_lower".to_string(), band(|b| b.lower));

    out.insert(format!("rsi_{}", params.rsi_period), rsi(candles, params.rsi_period));

    let macd_points = macd(candles, params.macd_fast, params.macd_slow, params.macd_signal);
    let macd_part = |f: fn(&MacdPoint) -> f64| -> IndicatorSeries {
        macd_points
            .iter()
            .map(|m| IndicatorPoint {
                timestamp: m.timestamp,
                value: f(m),
            })
            .collect()
    };
    out.insert("macd_line".to_string(), macd_part(|m| m.line));
    out.insert("macd_signal".to_string(), macd_part(|m| m.signal));
    out.insert("macd_histogram".to_string(), macd_part(|m| m.histogram));

    out.insert(format!("adx_{}", params.adx_period), adx(candles, params.adx_period));
    out.insert(format!("atr_{}", params.atr_period), atr(candles, params.atr_period));
    out.insert(format!("roc_{}", params.roc_period), roc(candles, params.roc_period));

    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::market::candle::Candle;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn dec(v: f64) -> Decimal {
        Decimal::from_f64(v).unwrap()
    }

    pub fn candle_hlc(i: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            symbol: "TESTUSDT".to_string(),
            open: dec(close),
            high: dec(high),
            low: dec(low),
            close: dec(close),
            volume: dec(1000.0),
            timestamp: 1_700_000_000_000 + i * 60_000,
        }
    }

    pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| candle_hlc(i as i64, c, c, c))
            .collect()
    }
}
