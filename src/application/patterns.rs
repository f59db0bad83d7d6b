//! Pattern Recognizer
//!
//! Stateless rule-based detectors over a candle window. Single- and
//! two-candle rules look at the tail of the window; the trend rule covers the
//! whole window. Every matching rule is reported.

use crate::domain::market::candle::Candle;
use crate::domain::market::pattern::{Pattern, PatternAction};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_VOLUME_WINDOW: usize = 20;
const MIN_TREND_CANDLES: usize = 3;

#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    /// Candles (including the latest) averaged for the volume spike rule
    pub volume_window: usize,
}

impl Default for PatternRecognizer {
    fn default() -> Self {
        Self {
            volume_window: DEFAULT_VOLUME_WINDOW,
        }
    }
}

impl PatternRecognizer {
    pub fn new(volume_window: usize) -> Self {
        Self { volume_window }
    }

    pub fn detect(&self, candles: &[Candle]) -> Vec<Pattern> {
        let mut patterns = Vec::new();
        let Some(latest) = candles.last() else {
            return patterns;
        };

        if is_doji(latest) {
            patterns.push(pattern(
                "doji",
                60,
                "Open and close nearly equal; indecision",
                PatternAction::Neutral,
            ));
        }

        if is_hammer(latest) {
            patterns.push(pattern(
                "hammer",
                70,
                "Long lower wick rejecting lower prices",
                PatternAction::Buy,
            ));
        }

        if let [.., previous, current] = candles {
            match engulfing(previous, current) {
                Some(PatternAction::Buy) => patterns.push(pattern(
                    "bullish_engulfing",
                    75,
                    "Bullish body engulfs the previous candle",
                    PatternAction::Buy,
                )),
                Some(PatternAction::Sell) => patterns.push(pattern(
                    "bearish_engulfing",
                    75,
                    "Bearish body engulfs the previous candle",
                    PatternAction::Sell,
                )),
                _ => {}
            }
        }

        if is_volume_spike(candles, self.volume_window) {
            patterns.push(pattern(
                "volume_spike",
                65,
                "Volume more than twice the recent average",
                PatternAction::Neutral,
            ));
        }

        match trend(candles) {
            Some(PatternAction::Buy) => patterns.push(pattern(
                "uptrend",
                80,
                "Closes rising across the whole window",
                PatternAction::Buy,
            )),
            Some(PatternAction::Sell) => patterns.push(pattern(
                "downtrend",
                80,
                "Closes falling across the whole window",
                PatternAction::Sell,
            )),
            _ => {}
        }

        patterns
    }
}

fn pattern(kind: &str, confidence: u8, description: &str, action: PatternAction) -> Pattern {
    Pattern {
        kind: kind.to_string(),
        confidence,
        description: description.to_string(),
        action,
    }
}

/// Body smaller than a tenth of the range. A zero-range candle never qualifies.
pub fn is_doji(candle: &Candle) -> bool {
    let range = candle.range();
    if range <= Decimal::ZERO {
        return false;
    }
    candle.body().abs() / range < dec!(0.1)
}

pub fn is_hammer(candle: &Candle) -> bool {
    let body = candle.body().abs();
    candle.lower_wick() > body * dec!(2) && candle.upper_wick() < body * dec!(0.5)
}

/// `Buy` for a bullish engulfing candle, `Sell` for bearish, `None` otherwise.
///
/// Only the body sizes are compared; the previous candle's colour is ignored.
pub fn engulfing(previous: &Candle, current: &Candle) -> Option<PatternAction> {
    if current.body().abs() <= previous.body().abs() * dec!(1.5) {
        return None;
    }
    if current.is_bullish() {
        Some(PatternAction::Buy)
    } else {
        Some(PatternAction::Sell)
    }
}

pub fn is_volume_spike(candles: &[Candle], window: usize) -> bool {
    if window == 0 || candles.is_empty() {
        return false;
    }
    let start = candles.len().saturating_sub(window);
    let recent = &candles[start..];
    let total: Decimal = recent.iter().map(|c| c.volume).sum();
    let mean = total / Decimal::from(recent.len());

    match recent.last() {
        Some(latest) => latest.volume > mean * dec!(2),
        None => false,
    }
}

/// Strictly monotonic closes across the whole window. A single reversal
/// anywhere disqualifies the trend.
pub fn trend(candles: &[Candle]) -> Option<PatternAction> {
    if candles.len() < MIN_TREND_CANDLES {
        return None;
    }
    if candles.windows(2).all(|w| w[1].close > w[0].close) {
        Some(PatternAction::Buy)
    } else if candles.windows(2).all(|w| w[1].close < w[0].close) {
        Some(PatternAction::Sell)
    } else {
        None
    }
}
