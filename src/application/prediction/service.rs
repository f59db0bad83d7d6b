use super::engine::{PredictionEngine, TimeframeReport};
use super::top_picks::TopPicksAggregator;
use crate::application::market_data::RefreshScheduler;
use crate::domain::prediction::TopPick;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct PassSummary {
    pub reports: Vec<TimeframeReport>,
    /// Empty when no timeframe produced a new prediction this pass
    pub top_picks: Vec<TopPick>,
}

impl PassSummary {
    pub fn generated(&self) -> usize {
        self.reports.iter().map(|r| r.generated.len()).sum()
    }
}

/// Drives prediction passes over the pairs in the scheduler's latest snapshot
pub struct PredictionService {
    scheduler: Arc<RefreshScheduler>,
    engine: Arc<PredictionEngine>,
    aggregator: Arc<TopPicksAggregator>,
    interval: Duration,
    /// Overrides the snapshot as the symbol universe when set
    fixed_symbols: Option<Vec<String>>,
}

impl PredictionService {
    pub fn new(
        scheduler: Arc<RefreshScheduler>,
        engine: Arc<PredictionEngine>,
        aggregator: Arc<TopPicksAggregator>,
        interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            engine,
            aggregator,
            interval,
            fixed_symbols: None,
        }
    }

    /// Predict a fixed symbol list instead of following the live snapshot
    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.fixed_symbols = Some(symbols);
        self
    }

    pub fn engine(&self) -> &PredictionEngine {
        &self.engine
    }

    /// One pass over the current snapshot
    pub async fn run_once(&self, now: DateTime<Utc>) -> PassSummary {
        let symbols: Vec<String> = match &self.fixed_symbols {
            Some(symbols) => symbols.clone(),
            None => self
                .scheduler
                .current_data()
                .iter()
                .map(|p| p.symbol.clone())
                .collect(),
        };

        if symbols.is_empty() {
            debug!("PredictionService: No pairs in snapshot yet, waiting");
            return PassSummary::default();
        }

        self.run_for(&symbols, now).await
    }

    /// One pass over an explicit symbol list
    pub async fn run_for(&self, symbols: &[String], now: DateTime<Utc>) -> PassSummary {
        let reports = self.engine.run_due(symbols, now).await;

        let generated: usize = reports.iter().map(|r| r.generated.len()).sum();
        let top_picks = if generated > 0 {
            self.aggregator.refresh().await
        } else {
            Vec::new()
        };

        PassSummary { reports, top_picks }
    }

    pub fn spawn(self: &Arc<Self>) -> PredictionHandle {
        let service = Arc::clone(self);

        let task = tokio::spawn(async move {
            info!(
                "PredictionService started. Interval: {:?}, timeframes: {:?}",
                service.interval,
                service.engine.settings().timeframes
            );

            let mut ticker = tokio::time::interval(service.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let summary = service.run_once(Utc::now()).await;
                if summary.generated() > 0 {
                    info!(
                        "PredictionService: {} predictions, {} top picks",
                        summary.generated(),
                        summary.top_picks.len()
                    );
                }
            }
        });

        PredictionHandle { task }
    }
}

pub struct PredictionHandle {
    task: JoinHandle<()>,
}

impl PredictionHandle {
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_data::{
        MarketDataFetcher, PairFilter, RandomSignalEstimator, SchedulerSettings,
    };
    use crate::application::prediction::gating::{DailyWindow, PredictionGate};
    use crate::application::prediction::engine::PredictionSettings;
    use crate::application::prediction::strategy::TrendVolumeHeuristic;
    use crate::application::prediction::top_picks::TopPicksConfig;
    use crate::infrastructure::mock::{MockCandleSource, MockExchangeGateway};
    use crate::infrastructure::repositories::InMemoryPredictionRepository;
    use crate::domain::market::timeframe::Timeframe;
    use chrono::TimeZone;

    fn build(repo: Arc<InMemoryPredictionRepository>) -> (Arc<RefreshScheduler>, PredictionService) {
        let fetcher = MarketDataFetcher::new(
            Arc::new(MockExchangeGateway::with_default_pairs()),
            Arc::new(RandomSignalEstimator),
            PairFilter::default(),
        );
        let scheduler = Arc::new(RefreshScheduler::new(
            Arc::new(fetcher),
            SchedulerSettings::default(),
        ));
        let engine = PredictionEngine::new(
            Arc::new(MockCandleSource::new(0.3)),
            repo.clone(),
            Arc::new(TrendVolumeHeuristic::default()),
            Arc::new(PredictionGate::new(DailyWindow::default())),
            PredictionSettings::default(),
        );
        let aggregator = TopPicksAggregator::new(repo, TopPicksConfig::default());
        let service = PredictionService::new(
            scheduler.clone(),
            Arc::new(engine),
            Arc::new(aggregator),
            Duration::from_secs(60),
        );
        (scheduler, service)
    }

    #[tokio::test]
    async fn test_waits_for_first_snapshot() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let (_scheduler, service) = build(repo.clone());

        let summary = service.run_once(Utc::now()).await;
        assert!(summary.reports.is_empty());
        assert_eq!(repo.prediction_count().await, 0);
    }

    #[tokio::test]
    async fn test_pass_over_snapshot_produces_picks() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let (scheduler, service) = build(repo.clone());
        scheduler.force_refresh().await;

        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 5, 0).unwrap();
        let summary = service.run_once(now).await;

        // three pairs pass the default filter, three timeframes due at 00:05
        assert_eq!(summary.reports.len(), 3);
        assert_eq!(summary.generated(), 9);
        assert_eq!(summary.top_picks.len(), 3);
        assert_eq!(repo.top_picks().await.len(), 3);

        // same instant again: nothing due, no new aggregation
        let again = service.run_once(now).await;
        assert_eq!(again.generated(), 0);
        assert!(again.top_picks.is_empty());
    }

    #[tokio::test]
    async fn test_fixed_symbols_ignore_snapshot() {
        let repo = Arc::new(InMemoryPredictionRepository::new());
        let (_scheduler, service) = build(repo.clone());
        let service = service.with_symbols(vec!["ADAUSDT".to_string()]);

        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 5, 0).unwrap();
        let summary = service.run_once(now).await;
        assert_eq!(summary.generated(), 3);
        assert!(repo.latest_prediction("ADAUSDT", Timeframe::OneDay).await.is_some());
    }
}
