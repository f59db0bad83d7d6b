//! In-Memory Repository Implementation
//!
//! Thread-safe, in-memory implementation of `PredictionRepository`.
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - No persistence across multiple instances
//! - Volatility metrics and market caps must be seeded by the caller

use crate::domain::errors::ServiceError;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::prediction::{
    Prediction, PredictionEstimate, RankedPrediction, TimeframeMetrics,
};
use crate::domain::repositories::PredictionRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A top pick as stored through `update_top_pick`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPickRecord {
    pub trading_pair: String,
    pub market_cap: Option<f64>,
    pub reason: String,
    pub timeframe: Timeframe,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}

pub struct InMemoryPredictionRepository {
    predictions: Arc<RwLock<Vec<Prediction>>>,
    timeframe_metrics: Arc<RwLock<HashMap<(String, Timeframe), TimeframeMetrics>>>,
    market_caps: Arc<RwLock<HashMap<String, f64>>>,
    top_picks: Arc<RwLock<HashMap<String, TopPickRecord>>>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self {
            predictions: Arc::new(RwLock::new(Vec::new())),
            timeframe_metrics: Arc::new(RwLock::new(HashMap::new())),
            market_caps: Arc::new(RwLock::new(HashMap::new())),
            top_picks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn set_timeframe_metrics(
        &self,
        pair: &str,
        timeframe: Timeframe,
        metrics: TimeframeMetrics,
    ) {
        self.timeframe_metrics
            .write()
            .await
            .insert((pair.to_string(), timeframe), metrics);
    }

    pub async fn set_market_cap(&self, pair: &str, market_cap: f64) {
        self.market_caps
            .write()
            .await
            .insert(pair.to_string(), market_cap);
    }

    pub async fn prediction_count(&self) -> usize {
        self.predictions.read().await.len()
    }

    pub async fn latest_prediction(&self, pair: &str, timeframe: Timeframe) -> Option<Prediction> {
        self.predictions
            .read()
            .await
            .iter()
            .rev()
            .find(|p| p.trading_pair == pair && p.timeframe == timeframe)
            .cloned()
    }

    /// Stored picks, best confidence first
    pub async fn top_picks(&self) -> Vec<TopPickRecord> {
        let mut picks: Vec<TopPickRecord> = self.top_picks.read().await.values().cloned().collect();
        picks.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.trading_pair.cmp(&b.trading_pair))
        });
        picks
    }
}

impl Default for InMemoryPredictionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    async fn save_prediction(
        &self,
        pair: &str,
        timeframe: Timeframe,
        change_pct: f64,
        confidence: f64,
    ) -> Result<Prediction, ServiceError> {
        if pair.is_empty() {
            return Err(ServiceError::invalid_input("Prediction without trading pair"));
        }

        let prediction = Prediction::new(
            pair,
            timeframe,
            PredictionEstimate {
                predicted_change_pct: change_pct,
                confidence_score: confidence,
            },
            Utc::now(),
        );
        self.predictions.write().await.push(prediction.clone());
        Ok(prediction)
    }

    async fn get_timeframe_metrics(
        &self,
        pair: &str,
        timeframe: Timeframe,
    ) -> Result<Option<TimeframeMetrics>, ServiceError> {
        Ok(self
            .timeframe_metrics
            .read()
            .await
            .get(&(pair.to_string(), timeframe))
            .copied())
    }

    async fn get_top_predictions(
        &self,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<RankedPrediction>, ServiceError> {
        let predictions = self.predictions.read().await;
        let caps = self.market_caps.read().await;

        // Later entries win, so this keeps the newest prediction per pair
        let mut latest: HashMap<&str, &Prediction> = HashMap::new();
        for p in predictions.iter().filter(|p| p.timeframe == timeframe) {
            latest.insert(p.trading_pair.as_str(), p);
        }

        let mut ranked: Vec<RankedPrediction> = latest
            .into_values()
            .map(|p| RankedPrediction {
                prediction: p.clone(),
                market_cap: caps.get(&p.trading_pair).copied(),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.prediction
                .score()
                .partial_cmp(&a.prediction.score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.prediction.trading_pair.cmp(&b.prediction.trading_pair))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn update_top_pick(
        &self,
        pair: &str,
        market_cap: Option<f64>,
        reason: &str,
        timeframe: Timeframe,
        confidence: f64,
    ) -> Result<(), ServiceError> {
        self.top_picks.write().await.insert(
            pair.to_string(),
            TopPickRecord {
                trading_pair: pair.to_string(),
                market_cap,
                reason: reason.to_string(),
                timeframe,
                confidence,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_normalizes_and_stores() {
        let repo = InMemoryPredictionRepository::new();
        let saved = repo
            .save_prediction("BTCUSDT", Timeframe::OneHour, 2.3456, 120.0)
            .await
            .unwrap();

        assert_eq!(saved.confidence_score, 95.0);
        assert_eq!(saved.predicted_change_pct, 2.35);
        assert_eq!(repo.prediction_count().await, 1);
        assert_eq!(
            repo.latest_prediction("BTCUSDT", Timeframe::OneHour).await,
            Some(saved)
        );
    }

    #[tokio::test]
    async fn test_empty_pair_is_rejected() {
        let repo = InMemoryPredictionRepository::new();
        let err = repo
            .save_prediction("", Timeframe::OneHour, 1.0, 50.0)
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_top_predictions_latest_per_pair_ranked() {
        let repo = InMemoryPredictionRepository::new();
        repo.save_prediction("AUSDT", Timeframe::OneHour, 5.0, 90.0).await.unwrap();
        repo.save_prediction("AUSDT", Timeframe::OneHour, 1.0, 50.0).await.unwrap();
        repo.save_prediction("BUSDT", Timeframe::OneHour, 3.0, 80.0).await.unwrap();
        repo.save_prediction("CUSDT", Timeframe::FourHour, 9.0, 90.0).await.unwrap();
        repo.set_market_cap("BUSDT", 2.5e9).await;

        let top = repo.get_top_predictions(Timeframe::OneHour, 10).await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].prediction.trading_pair, "BUSDT");
        assert_eq!(top[0].market_cap, Some(2.5e9));
        assert_eq!(top[1].prediction.predicted_change_pct, 1.0);
        assert_eq!(top[1].market_cap, None);

        let limited = repo.get_top_predictions(Timeframe::OneHour, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_timeframe_metrics_lookup() {
        let repo = InMemoryPredictionRepository::new();
        assert_eq!(
            repo.get_timeframe_metrics("BTCUSDT", Timeframe::OneDay).await.unwrap(),
            None
        );

        let metrics = TimeframeMetrics {
            volatility_score: 72.0,
            average_confidence: Some(61.0),
        };
        repo.set_timeframe_metrics("BTCUSDT", Timeframe::OneDay, metrics).await;
        assert_eq!(
            repo.get_timeframe_metrics("BTCUSDT", Timeframe::OneDay).await.unwrap(),
            Some(metrics)
        );
    }

    #[tokio::test]
    async fn test_top_pick_upsert() {
        let repo = InMemoryPredictionRepository::new();
        repo.update_top_pick("BTCUSDT", None, "first", Timeframe::OneHour, 60.0)
            .await
            .unwrap();
        repo.update_top_pick("BTCUSDT", Some(1e12), "second", Timeframe::FourHour, 70.0)
            .await
            .unwrap();

        let picks = repo.top_picks().await;
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].reason, "second");
        assert_eq!(picks[0].timeframe, Timeframe::FourHour);
        assert_eq!(picks[0].market_cap, Some(1e12));
    }
}
