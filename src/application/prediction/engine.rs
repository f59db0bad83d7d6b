//! Prediction Engine
//!
//! Turns candle history into per-(pair, timeframe) predictions. A timeframe
//! pass runs only when the gate says it is due; within a pass each pair is
//! handled independently, so one bad pair never aborts the others.

use super::gating::PredictionGate;
use super::strategy::{PredictionStrategy, apply_volatility_adjustment};
use crate::domain::errors::ServiceError;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::CandleSource;
use crate::domain::prediction::Prediction;
use crate::domain::repositories::PredictionRepository;
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSettings {
    pub timeframes: Vec<Timeframe>,
    /// Candles requested per pair and timeframe
    pub candle_limit: usize,
    /// Pairs with less history are skipped
    pub min_history: usize,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            timeframes: vec![Timeframe::OneHour, Timeframe::FourHour, Timeframe::OneDay],
            candle_limit: 100,
            min_history: 50,
        }
    }
}

/// Outcome counts for one timeframe pass
#[derive(Debug, Clone, PartialEq)]
pub struct TimeframeReport {
    pub timeframe: Timeframe,
    pub generated: Vec<Prediction>,
    pub skipped: usize,
    pub failed: usize,
}

impl TimeframeReport {
    fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            generated: Vec::new(),
            skipped: 0,
            failed: 0,
        }
    }
}

enum PairOutcome {
    Generated(Prediction),
    Skipped,
}

pub struct PredictionEngine {
    candles: Arc<dyn CandleSource>,
    repository: Arc<dyn PredictionRepository>,
    strategy: Arc<dyn PredictionStrategy>,
    gate: Arc<PredictionGate>,
    settings: PredictionSettings,
    metrics: Option<Metrics>,
}

impl PredictionEngine {
    pub fn new(
        candles: Arc<dyn CandleSource>,
        repository: Arc<dyn PredictionRepository>,
        strategy: Arc<dyn PredictionStrategy>,
        gate: Arc<PredictionGate>,
        settings: PredictionSettings,
    ) -> Self {
        Self {
            candles,
            repository,
            strategy,
            gate,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &PredictionSettings {
        &self.settings
    }

    pub fn gate(&self) -> &PredictionGate {
        &self.gate
    }

    /// Run every configured timeframe that is due at `now`.
    ///
    /// The gate is stamped for a timeframe only after its full pass completes
    /// and only if that pass stored at least one prediction, so a pass lost to
    /// an outage is retried on the next run.
    pub async fn run_due(&self, symbols: &[String], now: DateTime<Utc>) -> Vec<TimeframeReport> {
        let mut reports = Vec::new();

        for &timeframe in &self.settings.timeframes {
            if !self.gate.is_due(timeframe, now) {
                debug!("PredictionEngine: {} not due, skipping", timeframe);
                continue;
            }

            let report = self.generate_for_timeframe(symbols, timeframe).await;
            if report.generated.is_empty() {
                if report.failed > 0 {
                    warn!(
                        "PredictionEngine: {} pass produced nothing ({} failed), will retry",
                        timeframe, report.failed
                    );
                } else {
                    debug!("PredictionEngine: {} pass produced nothing, will retry", timeframe);
                }
            } else {
                self.gate.record(timeframe, now);
            }
            reports.push(report);
        }

        reports
    }

    /// Predict every symbol on one timeframe, ignoring the gate
    pub async fn generate_for_timeframe(
        &self,
        symbols: &[String],
        timeframe: Timeframe,
    ) -> TimeframeReport {
        let mut report = TimeframeReport::new(timeframe);

        for symbol in symbols {
            match self.predict_pair(symbol, timeframe).await {
                Ok(PairOutcome::Generated(prediction)) => report.generated.push(prediction),
                Ok(PairOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(
                        "PredictionEngine: {} {} failed [{}]: {}",
                        symbol, timeframe, e.code, e.message
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            "PredictionEngine: {} pass done ({} generated, {} skipped, {} failed) using {}",
            timeframe,
            report.generated.len(),
            report.skipped,
            report.failed,
            self.strategy.name()
        );

        if let Some(metrics) = &self.metrics {
            let tf = timeframe.to_string();
            metrics.inc_predictions(&tf, "generated", report.generated.len() as u64);
            metrics.inc_predictions(&tf, "skipped", report.skipped as u64);
            metrics.inc_predictions(&tf, "failed", report.failed as u64);
        }

        report
    }

    async fn predict_pair(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<PairOutcome, ServiceError> {
        let candles = self
            .candles
            .get_candles(symbol, timeframe, self.settings.candle_limit)
            .await?;

        if candles.len() < self.settings.min_history {
            debug!(
                "PredictionEngine: {} {} has {} candles, need {}",
                symbol,
                timeframe,
                candles.len(),
                self.settings.min_history
            );
            return Ok(PairOutcome::Skipped);
        }

        let Some(raw) = self.strategy.estimate(&candles) else {
            return Ok(PairOutcome::Skipped);
        };

        let metrics = self.repository.get_timeframe_metrics(symbol, timeframe).await?;
        let estimate = apply_volatility_adjustment(raw, metrics.as_ref());

        let prediction = self
            .repository
            .save_prediction(
                symbol,
                timeframe,
                estimate.predicted_change_pct,
                estimate.confidence_score,
            )
            .await?;

        debug!(
            "PredictionEngine: {} {} -> {:+.2}% @ {:.2}",
            symbol, timeframe, prediction.predicted_change_pct, prediction.confidence_score
        );
        Ok(PairOutcome::Generated(prediction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prediction::gating::DailyWindow;
    use crate::application::prediction::strategy::TrendVolumeHeuristic;
    use crate::domain::market::candle::Candle;
    use crate::domain::prediction::TimeframeMetrics;
    use crate::infrastructure::mock::MockCandleSource;
    use crate::infrastructure::repositories::InMemoryPredictionRepository;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ShortHistory;

    #[async_trait]
    impl CandleSource for ShortHistory {
        async fn get_candles(
            &self,
            symbol: &str,
            timeframe: Timeframe,
            _limit: usize,
        ) -> Result<Vec<Candle>, ServiceError> {
            MockCandleSource::default().get_candles(symbol, timeframe, 20).await
        }
    }

    struct Unreachable;

    #[async_trait]
    impl CandleSource for Unreachable {
        async fn get_candles(
            &self,
            symbol: &str,
            timeframe: Timeframe,
            limit: usize,
        ) -> Result<Vec<Candle>, ServiceError> {
            if symbol == "BADUSDT" {
                return Err(ServiceError::network("connection reset"));
            }
            MockCandleSource::new(0.2).get_candles(symbol, timeframe, limit).await
        }
    }

    /// Candle source that can be switched off to simulate an outage
    struct Flaky {
        down: AtomicBool,
    }

    #[async_trait]
    impl CandleSource for Flaky {
        async fn get_candles(
            &self,
            symbol: &str,
            timeframe: Timeframe,
            limit: usize,
        ) -> Result<Vec<Candle>, ServiceError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ServiceError::network("exchange unreachable"));
            }
            MockCandleSource::new(0.2).get_candles(symbol, timeframe, limit).await
        }
    }

    fn engine(
        candles: Arc<dyn CandleSource>,
        repo: Arc<InMemoryPredictionRepository>,
    ) -> PredictionEngine {
        PredictionEngine::new(
            candles,
            repo,
            Arc::new(TrendVolumeHeuristic::default()),
            Arc::new(PredictionGate::new(DailyWindow::default())),
            PredictionSettings::default(),
        )
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_generates_and_persists() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let engine = engine(Arc::new(MockCandleSource::new(0.2)), repo.clone());

        let report = engine
            .generate_for_timeframe(&symbols(&["BTCUSDT", "ETHUSDT"]), Timeframe::OneHour)
            .await;

        assert_eq!(report.generated.len(), 2);
        assert_eq!(repo.prediction_count().await, 2);
        for p in &report.generated {
            assert!((0.0..=95.0).contains(&p.confidence_score));
        }
    }

    #[tokio::test]
    async fn test_short_history_is_skipped() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let engine = engine(Arc::new(ShortHistory), repo.clone());

        let report = engine
            .generate_for_timeframe(&symbols(&["BTCUSDT"]), Timeframe::OneHour)
            .await;

        assert!(report.generated.is_empty());
        assert_eq!(report.skipped, 1);
        assert_eq!(repo.prediction_count().await, 0);
    }

    #[tokio::test]
    async fn test_failing_pair_does_not_abort_pass() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let engine = engine(Arc::new(Unreachable), repo.clone());

        let report = engine
            .generate_for_timeframe(&symbols(&["BADUSDT", "SOLUSDT"]), Timeframe::FourHour)
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.generated.len(), 1);
        assert_eq!(report.generated[0].trading_pair, "SOLUSDT");
    }

    #[tokio::test]
    async fn test_run_due_respects_gate() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let engine = engine(Arc::new(MockCandleSource::new(0.2)), repo.clone());
        let pairs = symbols(&["BTCUSDT"]);

        // noon: 1h and 4h due, daily outside window
        let first = engine.run_due(&pairs, noon()).await;
        let tfs: Vec<Timeframe> = first.iter().map(|r| r.timeframe).collect();
        assert_eq!(tfs, vec![Timeframe::OneHour, Timeframe::FourHour]);

        // 30 minutes later nothing is due
        let later = noon() + chrono::Duration::minutes(30);
        assert!(engine.run_due(&pairs, later).await.is_empty());

        // one hour later only 1h
        let next_hour = noon() + chrono::Duration::hours(1);
        let third = engine.run_due(&pairs, next_hour).await;
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].timeframe, Timeframe::OneHour);
    }

    #[tokio::test]
    async fn test_volatility_metrics_scale_prediction() {
        let calm_repo = Arc::new(InMemoryPredictionRepository::new());
        let wild_repo = Arc::new(InMemoryPredictionRepository::new());
        wild_repo
            .set_timeframe_metrics(
                "BTCUSDT",
                Timeframe::OneHour,
                TimeframeMetrics {
                    volatility_score: 90.0,
                    average_confidence: None,
                },
            )
            .await;

        let pairs = symbols(&["BTCUSDT"]);
        let calm = engine(Arc::new(MockCandleSource::new(0.2)), calm_repo)
            .generate_for_timeframe(&pairs, Timeframe::OneHour)
            .await;
        let wild = engine(Arc::new(MockCandleSource::new(0.2)), wild_repo)
            .generate_for_timeframe(&pairs, Timeframe::OneHour)
            .await;

        let base = calm.generated[0].predicted_change_pct;
        let scaled = wild.generated[0].predicted_change_pct;
        assert!((scaled - base * 1.5).abs() < 0.02);
        assert!(wild.generated[0].confidence_score < calm.generated[0].confidence_score);
    }

    #[tokio::test]
    async fn test_outage_inside_daily_window_is_retried() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let source = Arc::new(Flaky {
            down: AtomicBool::new(true),
        });
        let engine = PredictionEngine::new(
            source.clone(),
            repo.clone(),
            Arc::new(TrendVolumeHeuristic::default()),
            Arc::new(PredictionGate::new(DailyWindow::default())),
            PredictionSettings {
                timeframes: vec![Timeframe::OneDay],
                ..PredictionSettings::default()
            },
        );
        let pairs = symbols(&["BTCUSDT"]);

        let down = engine
            .run_due(&pairs, Utc.with_ymd_and_hms(2025, 1, 1, 0, 1, 0).unwrap())
            .await;
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].failed, 1);
        assert!(engine.gate().last_generated(Timeframe::OneDay).is_none());

        source.down.store(false, Ordering::SeqCst);
        let recovered_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 3, 0).unwrap();
        let recovered = engine.run_due(&pairs, recovered_at).await;
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].generated.len(), 1);
        assert_eq!(repo.prediction_count().await, 1);
        assert_eq!(engine.gate().last_generated(Timeframe::OneDay), Some(recovered_at));
    }

    #[tokio::test]
    async fn test_sub_daily_outage_does_not_burn_interval() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let source = Arc::new(Flaky {
            down: AtomicBool::new(true),
        });
        let engine = engine(source.clone(), repo.clone());
        let pairs = symbols(&["BTCUSDT"]);

        assert!(engine.run_due(&pairs, noon()).await.iter().all(|r| r.generated.is_empty()));

        source.down.store(false, Ordering::SeqCst);
        let retry = engine
            .run_due(&pairs, noon() + chrono::Duration::minutes(1))
            .await;
        let tfs: Vec<Timeframe> = retry.iter().map(|r| r.timeframe).collect();
        assert_eq!(tfs, vec![Timeframe::OneHour, Timeframe::FourHour]);
        assert_eq!(repo.prediction_count().await, 2);
    }
}
