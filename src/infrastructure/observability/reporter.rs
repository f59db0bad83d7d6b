//! Push-based metrics reporter for MarketPulse
//!
//! Periodically outputs a structured JSON snapshot to stdout. Nothing is
//! served; data only flows out.

use crate::application::market_data::RefreshScheduler;
use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub market: MarketSnapshot,
    pub refreshes: RefreshSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MarketSnapshot {
    pub tracked_pairs: usize,
    pub progress: f64,
    pub last_refresh_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RefreshSnapshot {
    pub success: u64,
    pub failure: u64,
    pub coalesced: u64,
}

pub struct MetricsReporter {
    scheduler: Arc<RefreshScheduler>,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(scheduler: Arc<RefreshScheduler>, metrics: Metrics, interval: Duration) -> Self {
        Self {
            scheduler,
            metrics,
            start_time: Instant::now(),
            interval,
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Pairs: {} | Refreshes ok/failed/coalesced: {}/{}/{} | Uptime: {}s",
                        snapshot.market.tracked_pairs,
                        snapshot.refreshes.success,
                        snapshot.refreshes.failure,
                        snapshot.refreshes.coalesced,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("MetricsReporter: Failed to serialize metrics: {}", e),
            }
        }
    }

    fn collect_snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        self.metrics.uptime_seconds.set(uptime as f64);

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            market: MarketSnapshot {
                tracked_pairs: self.scheduler.current_data().len(),
                progress: self.scheduler.current_progress(),
                last_refresh_ms: self.scheduler.last_refresh_time(),
            },
            refreshes: RefreshSnapshot {
                success: self.metrics.refresh_count("success") as u64,
                failure: self.metrics.refresh_count("failure") as u64,
                coalesced: self.metrics.refresh_count("coalesced") as u64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_data::{
        MarketDataFetcher, PairFilter, RandomSignalEstimator, SchedulerSettings,
    };
    use crate::infrastructure::mock::MockExchangeGateway;

    #[tokio::test]
    async fn test_snapshot_reflects_scheduler_and_counters() {
        let fetcher = MarketDataFetcher::new(
            Arc::new(MockExchangeGateway::with_default_pairs()),
            Arc::new(RandomSignalEstimator),
            PairFilter::default(),
        );
        let metrics = Metrics::new().expect("Failed to create metrics");
        let scheduler = Arc::new(
            RefreshScheduler::new(Arc::new(fetcher), SchedulerSettings::default())
                .with_metrics(metrics.clone()),
        );
        scheduler.force_refresh().await;

        let reporter = MetricsReporter::new(scheduler, metrics, Duration::from_secs(60));
        let snapshot = reporter.collect_snapshot();

        assert_eq!(snapshot.market.tracked_pairs, 3);
        assert_eq!(snapshot.market.progress, 100.0);
        assert!(snapshot.market.last_refresh_ms.is_some());
        assert_eq!(snapshot.refreshes.success, 1);
        assert_eq!(snapshot.refreshes.failure, 0);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = MetricsSnapshot {
            timestamp: "2026-01-10T10:00:00Z".to_string(),
            uptime_seconds: 3600,
            version: "0.4.2".to_string(),
            market: MarketSnapshot {
                tracked_pairs: 80,
                progress: 42.5,
                last_refresh_ms: None,
            },
            refreshes: RefreshSnapshot {
                success: 10,
                failure: 1,
                coalesced: 2,
            },
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"tracked_pairs\":80"));
        assert!(json.contains("\"last_refresh_ms\":null"));
    }
}
