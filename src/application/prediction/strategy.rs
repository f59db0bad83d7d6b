use crate::application::indicators::moving_average;
use crate::domain::market::candle::{Candle, closes, volumes};
use crate::domain::prediction::{PredictionEstimate, TimeframeMetrics};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scores a candle history into a directional estimate
pub trait PredictionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the history is too short for the strategy's windows
    fn estimate(&self, candles: &[Candle]) -> Option<PredictionEstimate>;
}

/// Linear magnitude/confidence range for one trend quadrant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicRange {
    pub magnitude_min: f64,
    pub magnitude_max: f64,
    pub confidence_min: f64,
    pub confidence_max: f64,
}

impl HeuristicRange {
    pub const fn new(
        magnitude_min: f64,
        magnitude_max: f64,
        confidence_min: f64,
        confidence_max: f64,
    ) -> Self {
        Self {
            magnitude_min,
            magnitude_max,
            confidence_min,
            confidence_max,
        }
    }

    /// Point in the range at `position` (clamped to 0..=1)
    pub fn at(&self, position: f64) -> PredictionEstimate {
        let t = if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            0.0
        };
        PredictionEstimate {
            predicted_change_pct: self.magnitude_min + (self.magnitude_max - self.magnitude_min) * t,
            confidence_score: self.confidence_min + (self.confidence_max - self.confidence_min) * t,
        }
    }
}

/// Quadrant table for the trend/volume heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicTable {
    pub bullish_confirmed: HeuristicRange,
    pub bullish_unconfirmed: HeuristicRange,
    pub bearish_unconfirmed: HeuristicRange,
    pub bearish_confirmed: HeuristicRange,
    /// MA spread (percent of the slow MA) at which a range is fully traversed
    pub spread_saturation_pct: f64,
}

impl Default for HeuristicTable {
    fn default() -> Self {
        Self {
            bullish_confirmed: HeuristicRange::new(2.0, 5.0, 70.0, 85.0),
            bullish_unconfirmed: HeuristicRange::new(0.5, 2.0, 50.0, 65.0),
            bearish_unconfirmed: HeuristicRange::new(-0.5, -2.0, 45.0, 60.0),
            bearish_confirmed: HeuristicRange::new(-2.0, -5.0, 65.0, 80.0),
            spread_saturation_pct: 2.0,
        }
    }
}

impl HeuristicTable {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse prediction table TOML")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prediction table file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn range_for(&self, bullish: bool, confirmed: bool) -> &HeuristicRange {
        match (bullish, confirmed) {
            (true, true) => &self.bullish_confirmed,
            (true, false) => &self.bullish_unconfirmed,
            (false, false) => &self.bearish_unconfirmed,
            (false, true) => &self.bearish_confirmed,
        }
    }
}

/// MA(fast) vs MA(slow) sets the bias, latest volume vs its short MA confirms it
#[derive(Debug, Clone)]
pub struct TrendVolumeHeuristic {
    pub table: HeuristicTable,
    pub fast_period: usize,
    pub slow_period: usize,
    pub volume_period: usize,
}

impl TrendVolumeHeuristic {
    pub fn new(table: HeuristicTable) -> Self {
        Self {
            table,
            fast_period: 9,
            slow_period: 21,
            volume_period: 5,
        }
    }
}

impl Default for TrendVolumeHeuristic {
    fn default() -> Self {
        Self::new(HeuristicTable::default())
    }
}

impl PredictionStrategy for TrendVolumeHeuristic {
    fn name(&self) -> &str {
        "TrendVolume"
    }

    fn estimate(&self, candles: &[Candle]) -> Option<PredictionEstimate> {
        let prices = closes(candles);
        let fast = *moving_average(&prices, self.fast_period).last()?;
        let slow = *moving_average(&prices, self.slow_period).last()?;

        let vols = volumes(candles);
        let volume_ma = *moving_average(&vols, self.volume_period).last()?;
        let latest_volume = *vols.last()?;

        // A flat crossover counts as bearish
        let bullish = fast > slow;
        let confirmed = latest_volume > volume_ma;

        let position = if slow != 0.0 && self.table.spread_saturation_pct > 0.0 {
            let spread_pct = (fast - slow).abs() / slow.abs() * 100.0;
            spread_pct / self.table.spread_saturation_pct
        } else {
            0.0
        };

        Some(self.table.range_for(bullish, confirmed).at(position))
    }
}

/// Scale an estimate by timeframe volatility, then clamp and round it.
///
/// Scores above 70 widen the move and lower confidence; scores below 30 do
/// the opposite. Missing metrics leave the estimate unscaled.
pub fn apply_volatility_adjustment(
    estimate: PredictionEstimate,
    metrics: Option<&TimeframeMetrics>,
) -> PredictionEstimate {
    let (magnitude_factor, confidence_factor) = match metrics.map(|m| m.volatility_score) {
        Some(v) if v > 70.0 => (1.5, 0.85),
        Some(v) if v < 30.0 => (0.7, 1.1),
        _ => (1.0, 1.0),
    };

    PredictionEstimate {
        predicted_change_pct: estimate.predicted_change_pct * magnitude_factor,
        confidence_score: estimate.confidence_score * confidence_factor,
    }
    .normalized()
}
