//! Persistence boundary for predictions and top picks.
//!
//! The storage engine is an external collaborator; the engine only talks to
//! this trait. `InMemoryPredictionRepository` in `infrastructure` implements it
//! for tests and single-process runs.

use crate::domain::errors::ServiceError;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::prediction::{Prediction, RankedPrediction, TimeframeMetrics};
use async_trait::async_trait;

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Persist a newly generated prediction and return the stored record
    async fn save_prediction(
        &self,
        pair: &str,
        timeframe: Timeframe,
        change_pct: f64,
        confidence: f64,
    ) -> Result<Prediction, ServiceError>;

    /// Volatility and related statistics for a pair on a timeframe, if known
    async fn get_timeframe_metrics(
        &self,
        pair: &str,
        timeframe: Timeframe,
    ) -> Result<Option<TimeframeMetrics>, ServiceError>;

    /// Latest prediction per pair on `timeframe`, best score first
    async fn get_top_predictions(
        &self,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<RankedPrediction>, ServiceError>;

    /// Record the pair as a current top pick
    async fn update_top_pick(
        &self,
        pair: &str,
        market_cap: Option<f64>,
        reason: &str,
        timeframe: Timeframe,
        confidence: f64,
    ) -> Result<(), ServiceError>;
}
