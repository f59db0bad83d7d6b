use crate::domain::market::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest confidence any prediction may carry
pub const MAX_CONFIDENCE: f64 = 95.0;

/// Output of a scoring strategy before it is attached to a pair/timeframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionEstimate {
    pub predicted_change_pct: f64,
    pub confidence_score: f64,
}

impl PredictionEstimate {
    /// Clamps confidence into [0, MAX_CONFIDENCE] and rounds both values to two decimals
    pub fn normalized(self) -> Self {
        let confidence = if self.confidence_score.is_nan() {
            0.0
        } else {
            self.confidence_score.clamp(0.0, MAX_CONFIDENCE)
        };
        Self {
            predicted_change_pct: round2(self.predicted_change_pct),
            confidence_score: round2(confidence),
        }
    }

    /// Ranking score: expected move weighted by confidence
    pub fn score(&self) -> f64 {
        self.predicted_change_pct * (self.confidence_score / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: Uuid,
    pub trading_pair: String,
    pub timeframe: Timeframe,
    pub predicted_change_pct: f64,
    pub confidence_score: f64,
    pub prediction_timestamp: DateTime<Utc>,
}

impl Prediction {
    pub fn new(
        trading_pair: impl Into<String>,
        timeframe: Timeframe,
        estimate: PredictionEstimate,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let estimate = estimate.normalized();
        Self {
            id: Uuid::new_v4(),
            trading_pair: trading_pair.into(),
            timeframe,
            predicted_change_pct: estimate.predicted_change_pct,
            confidence_score: estimate.confidence_score,
            prediction_timestamp: timestamp,
        }
    }

    pub fn score(&self) -> f64 {
        self.predicted_change_pct * (self.confidence_score / 100.0)
    }
}

/// A stored prediction joined with the market cap known to the persistence layer
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPrediction {
    pub prediction: Prediction,
    pub market_cap: Option<f64>,
}

/// Per (pair, timeframe) statistics kept by the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeMetrics {
    /// 0-100
    pub volatility_score: f64,
    pub average_confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPick {
    pub trading_pair: String,
    pub market_cap: Option<f64>,
    pub total_score: f64,
    pub best_timeframe: Timeframe,
    pub best_prediction: f64,
    pub best_confidence: f64,
    pub selection_reason: String,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
