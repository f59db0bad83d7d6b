//! Application wiring: builds every service from `Config` and starts the
//! background loops.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::market_data::{
    MarketDataFetcher, RandomSignalEstimator, RefreshOutcome, RefreshScheduler, SchedulerHandle,
};
use crate::application::prediction::{
    PassSummary, PredictionEngine, PredictionGate, PredictionHandle, PredictionService,
    TopPicksAggregator, TrendVolumeHeuristic,
};
use crate::config::Config;
use crate::domain::ports::CandleSource;
use crate::infrastructure::csv_candles::{CsvCandleSource, load_market_caps};
use crate::infrastructure::factory::ServiceFactory;
use crate::infrastructure::observability::{Metrics, MetricsReporter};
use crate::infrastructure::repositories::InMemoryPredictionRepository;

pub struct Application {
    pub config: Config,
    pub metrics: Metrics,
    pub scheduler: Arc<RefreshScheduler>,
    pub prediction_service: Arc<PredictionService>,
    pub repository: Arc<InMemoryPredictionRepository>,
}

/// Running background tasks. Dropping the handle leaves them running.
pub struct SystemHandle {
    pub scheduler: SchedulerHandle,
    pub prediction: Option<PredictionHandle>,
    pub reporter: Option<JoinHandle<()>>,
    pub metrics: Metrics,
}

impl SystemHandle {
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        if let Some(prediction) = &self.prediction {
            prediction.shutdown();
        }
        if let Some(reporter) = &self.reporter {
            reporter.abort();
        }
    }
}

impl Application {
    /// `history_csv` replaces the exchange candle source with an offline file;
    /// its symbols then become the prediction universe.
    pub async fn build(config: Config, history_csv: Option<&Path>) -> Result<Self> {
        info!(
            "Building MarketPulse Application (Exchange: {:?})...",
            config.exchange.mode
        );

        let metrics = Metrics::new()?;
        let (gateway, exchange_candles) =
            ServiceFactory::create_market_services(&config.exchange);

        let (candles, fixed_symbols): (Arc<dyn CandleSource>, Option<Vec<String>>) =
            match history_csv {
                Some(path) => {
                    let source = CsvCandleSource::from_path(path)
                        .with_context(|| format!("Failed to load history {}", path.display()))?;
                    let symbols = source.symbols();
                    info!("Using offline history for {} symbols", symbols.len());
                    (Arc::new(source), Some(symbols))
                }
                None => (exchange_candles, None),
            };

        let fetcher = MarketDataFetcher::new(
            gateway,
            Arc::new(RandomSignalEstimator),
            config.exchange.pair_filter(),
        );
        let scheduler = Arc::new(
            RefreshScheduler::new(Arc::new(fetcher), config.scheduler.settings())
                .with_metrics(metrics.clone()),
        );

        let repository = Arc::new(InMemoryPredictionRepository::new());
        let mut seeded_caps = 0;
        if let Some(path) = &config.prediction.market_caps_path {
            let caps = load_market_caps(path)
                .with_context(|| format!("Failed to load market caps {}", path.display()))?;
            seeded_caps = caps.len();
            for (pair, cap) in caps {
                repository.set_market_cap(&pair, cap).await;
            }
        }
        let band = config.prediction.top_picks().band;
        if seeded_caps == 0 && band.filters_by_cap() {
            if band.require_known {
                warn!(
                    "No market caps loaded and TOP_PICKS_REQUIRE_MARKET_CAP is set: every pair will be excluded from top picks"
                );
            } else {
                warn!(
                    "No market caps loaded: the market-cap band cannot exclude anything (set TOP_PICKS_MARKET_CAPS_PATH)"
                );
            }
        }
        let table = config
            .prediction
            .heuristic_table()
            .context("Failed to load prediction table")?;
        let engine = PredictionEngine::new(
            candles,
            repository.clone(),
            Arc::new(TrendVolumeHeuristic::new(table)),
            Arc::new(PredictionGate::new(config.prediction.daily_window())),
            config.prediction.settings(),
        )
        .with_metrics(metrics.clone());
        let aggregator = TopPicksAggregator::new(repository.clone(), config.prediction.top_picks())
            .with_metrics(metrics.clone());

        let mut prediction_service = PredictionService::new(
            scheduler.clone(),
            Arc::new(engine),
            Arc::new(aggregator),
            config.prediction.interval(),
        );
        if let Some(symbols) = fixed_symbols {
            prediction_service = prediction_service.with_symbols(symbols);
        }

        Ok(Self {
            config,
            metrics,
            scheduler,
            prediction_service: Arc::new(prediction_service),
            repository,
        })
    }

    /// Start the refresh loop, prediction loop and metrics reporter
    pub fn start(&self) -> SystemHandle {
        info!("Starting refresh scheduler...");
        let scheduler = self.scheduler.spawn();

        let prediction = if self.config.prediction.enabled {
            info!("Starting prediction service...");
            Some(self.prediction_service.spawn())
        } else {
            info!("Prediction service disabled.");
            None
        };

        let reporter = if self.config.observability.metrics_enabled {
            let reporter = MetricsReporter::new(
                self.scheduler.clone(),
                self.metrics.clone(),
                self.config.observability.report_interval(),
            );
            Some(tokio::spawn(reporter.run()))
        } else {
            info!("Metrics reporting disabled.");
            None
        };

        SystemHandle {
            scheduler,
            prediction,
            reporter,
            metrics: self.metrics.clone(),
        }
    }

    /// Single refresh followed by a single prediction pass
    pub async fn run_once(&self, now: DateTime<Utc>) -> PassSummary {
        match self.scheduler.force_refresh().await {
            RefreshOutcome::Refreshed(count) => info!("Refreshed {} pairs", count),
            RefreshOutcome::Failed(e) => warn!("Refresh failed: {}", e),
            RefreshOutcome::Coalesced => {}
        }
        self.prediction_service.run_once(now).await
    }
}
