use super::IndicatorPoint;
use crate::domain::market::candle::Candle;
use serde::Serialize;
use ta::Next;
use ta::indicators::{MovingAverageConvergenceDivergence, RelativeStrengthIndex};

/// RSI over closes. First entry at index `period`.
pub fn rsi(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    let Ok(mut indicator) = RelativeStrengthIndex::new(period) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(candles.len().saturating_sub(period));
    for (i, candle) in candles.iter().enumerate() {
        let value = indicator.next(candle.close_f64());
        if i >= period {
            out.push(IndicatorPoint {
                timestamp: candle.timestamp,
                value,
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdPoint {
    pub timestamp: i64,
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line/signal/histogram. First entry at index `slow + signal - 2`,
/// where both the slow EMA and the signal EMA have a full window behind them.
pub fn macd(candles: &[Candle], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    if fast == 0 || slow == 0 || signal == 0 {
        return Vec::new();
    }
    let Ok(mut indicator) = MovingAverageConvergenceDivergence::new(fast, slow, signal) else {
        return Vec::new();
    };

    let first_valid = slow + signal - 2;
    let mut out = Vec::with_capacity(candles.len().saturating_sub(first_valid));
    for (i, candle) in candles.iter().enumerate() {
        let value = indicator.next(candle.close_f64());
        if i >= first_valid {
            out.push(MacdPoint {
                timestamp: candle.timestamp,
                line: value.macd,
                signal: value.signal,
                histogram: value.macd - value.signal,
            });
        }
    }
    out
}

/// Rate of change in percent against the close `period` candles earlier
pub fn roc(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || candles.len() <= period {
        return Vec::new();
    }

    candles
        .iter()
        .enumerate()
        .skip(period)
        .map(|(i, candle)| {
            let prior = candles[i - period].close_f64();
            let value = if prior != 0.0 {
                (candle.close_f64() - prior) / prior * 100.0
            } else {
                0.0
            };
            IndicatorPoint {
                timestamp: candle.timestamp,
                value,
            }
        })
        .collect()
}
