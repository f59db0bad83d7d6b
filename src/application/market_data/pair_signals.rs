use crate::domain::market::trading_pair::{TickerStats, VelocityTrend};
use crate::domain::prediction::round2;
use rand::Rng;

/// Derived per-pair signals attached to each ticker refresh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSignals {
    /// -1.0 (all asks) to 1.0 (all bids)
    pub order_book_imbalance: f64,
    /// Percent per hour
    pub price_velocity: f64,
    pub velocity_trend: VelocityTrend,
    /// 0-100
    pub pump_probability: f64,
}

impl Default for PairSignals {
    fn default() -> Self {
        Self {
            order_book_imbalance: 0.0,
            price_velocity: 0.0,
            velocity_trend: VelocityTrend::Stable,
            pump_probability: 0.0,
        }
    }
}

/// Produces the signal fields of a `TradingPair` from its ticker
pub trait PairSignalEstimator: Send + Sync {
    fn estimate(&self, symbol: &str, stats: &TickerStats) -> PairSignals;
}

/// Placeholder estimator: jittered 24h velocity plus random imbalance and pump odds.
///
/// These values are not derived from the trend heuristics used for predictions
/// and should not be read as correlated with them.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSignalEstimator;

impl PairSignalEstimator for RandomSignalEstimator {
    fn estimate(&self, _symbol: &str, stats: &TickerStats) -> PairSignals {
        let mut rng = rand::rng();

        let price_velocity = stats.price_change_pct / 24.0 * rng.random_range(0.5..1.5);
        let acceleration: f64 = rng.random_range(-1.0..1.0);
        let velocity_trend = if acceleration > 0.33 {
            VelocityTrend::Accelerating
        } else if acceleration < -0.33 {
            VelocityTrend::Decelerating
        } else {
            VelocityTrend::Stable
        };

        PairSignals {
            order_book_imbalance: round2(rng.random_range(-1.0..1.0)),
            price_velocity: round2(price_velocity),
            velocity_trend,
            pump_probability: round2(rng.random_range(0.0..100.0)),
        }
    }
}
