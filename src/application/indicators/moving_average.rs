use super::IndicatorPoint;
use crate::domain::market::candle::{Candle, closes};
use serde::Serialize;

/// Simple moving average over raw values.
///
/// Output has `values.len() - window + 1` entries; the first corresponds to
/// index `window - 1` of the input. Empty when the window is 0 or larger than
/// the input.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Moving average of closes, stamped with the timestamp of the last candle in each window
pub fn sma(candles: &[Candle], window: usize) -> Vec<IndicatorPoint> {
    let values = moving_average(&closes(candles), window);
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| IndicatorPoint {
            timestamp: candles[i + window - 1].timestamp,
            value,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerPoint {
    pub timestamp: i64,
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands: MA(period) ± k·σ with σ the population standard deviation
pub fn bollinger_bands(candles: &[Candle], period: usize, k: f64) -> Vec<BollingerPoint> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    let prices = closes(candles);
    prices
        .windows(period)
        .enumerate()
        .map(|(i, window)| {
            let n = period as f64;
            let mean = window.iter().sum::<f64>() / n;
            let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let sigma = variance.sqrt();
            BollingerPoint {
                timestamp: candles[i + period - 1].timestamp,
                upper: mean + k * sigma,
                middle: mean,
                lower: mean - k * sigma,
            }
        })
        .collect()
}
