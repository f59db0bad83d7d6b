//! Refresh Scheduler
//!
//! Owns the ticker refresh cadence. A one-second tick recomputes progress
//! (100 right after a refresh, 0 when the interval has fully elapsed) and
//! triggers a fetch when it reaches 0. Only one fetch runs at a time; requests
//! arriving while one is in flight are coalesced into it.
//!
//! After every fetch, successful or not, the refresh clock restarts. A failed
//! fetch keeps the previous snapshot and waits for the next natural expiry or
//! an explicit `force_refresh`.

use crate::application::market_data::fetcher::MarketDataFetcher;
use crate::application::market_data::subscription_bus::{
    Subscription, SubscriptionBus, UpdateListener,
};
use crate::domain::errors::ServiceError;
use crate::domain::market::trading_pair::TradingPair;
use crate::infrastructure::observability::Metrics;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Shared, wholesale-replaced pair snapshot
pub type PairSnapshot = Arc<Vec<TradingPair>>;

const NEVER_REFRESHED: i64 = i64::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Fetching,
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// New snapshot published with this many pairs
    Refreshed(usize),
    /// Fetch failed, previous snapshot kept
    Failed(ServiceError),
    /// Another fetch was already in flight
    Coalesced,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    pub refresh_interval: Duration,
    pub tick_period: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            tick_period: Duration::from_secs(1),
        }
    }
}

/// Clears the in-flight flag even if the refresh future is dropped mid-fetch
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct RefreshScheduler {
    fetcher: Arc<MarketDataFetcher>,
    settings: SchedulerSettings,
    fetching: AtomicBool,
    last_refresh_ms: AtomicI64,
    data_bus: SubscriptionBus<PairSnapshot>,
    progress_bus: SubscriptionBus<f64>,
    metrics: Option<Metrics>,
}

impl RefreshScheduler {
    pub fn new(fetcher: Arc<MarketDataFetcher>, settings: SchedulerSettings) -> Self {
        Self {
            fetcher,
            settings,
            fetching: AtomicBool::new(false),
            last_refresh_ms: AtomicI64::new(NEVER_REFRESHED),
            data_bus: SubscriptionBus::new("pairs", Arc::new(Vec::new())),
            progress_bus: SubscriptionBus::new("progress", 0.0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    pub fn state(&self) -> SchedulerState {
        if self.fetching.load(Ordering::SeqCst) {
            SchedulerState::Fetching
        } else {
            SchedulerState::Idle
        }
    }

    /// Epoch ms of the last completed fetch (success or failure)
    pub fn last_refresh_time(&self) -> Option<i64> {
        match self.last_refresh_ms.load(Ordering::SeqCst) {
            NEVER_REFRESHED => None,
            ms => Some(ms),
        }
    }

    pub fn subscribe_to_data(
        &self,
        listener: impl UpdateListener<PairSnapshot> + 'static,
    ) -> Subscription {
        self.data_bus.subscribe(listener)
    }

    pub fn subscribe_to_progress(&self, listener: impl UpdateListener<f64> + 'static) -> Subscription {
        self.progress_bus.subscribe(listener)
    }

    pub fn current_data(&self) -> PairSnapshot {
        self.data_bus.latest()
    }

    pub fn current_progress(&self) -> f64 {
        self.progress_bus.latest()
    }

    /// Progress at `now_ms`, clamped to [0, 100]
    pub fn progress_at(&self, now_ms: i64) -> f64 {
        let Some(last) = self.last_refresh_time() else {
            return 0.0;
        };
        let interval_ms = self.settings.refresh_interval.as_millis() as f64;
        if interval_ms <= 0.0 {
            return 0.0;
        }
        let elapsed = (now_ms - last) as f64;
        (100.0 - (elapsed / interval_ms * 100.0)).clamp(0.0, 100.0)
    }

    /// Recompute and publish progress. Returns true when a fetch is due.
    pub fn tick_at(&self, now_ms: i64) -> bool {
        let progress = self.progress_at(now_ms);
        self.progress_bus.publish(progress);
        progress <= 0.0 && self.state() == SchedulerState::Idle
    }

    /// Fetch now unless a fetch is already in flight
    pub async fn force_refresh(&self) -> RefreshOutcome {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("RefreshScheduler: Fetch already in flight, request coalesced");
            self.record_outcome("coalesced");
            return RefreshOutcome::Coalesced;
        }
        let _guard = InFlightGuard(&self.fetching);

        let started = Instant::now();
        let result = self.fetcher.fetch().await;
        let completed_ms = chrono::Utc::now().timestamp_millis();

        if let Some(metrics) = &self.metrics {
            metrics
                .fetch_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }

        let outcome = match result {
            Ok(pairs) => {
                let snapshot = self.stamp_snapshot(pairs, completed_ms);
                let count = snapshot.len();
                self.data_bus.publish(Arc::new(snapshot));
                info!("RefreshScheduler: Published {} trading pairs", count);
                if let Some(metrics) = &self.metrics {
                    metrics.tracked_pairs.set(count as f64);
                }
                self.record_outcome("success");
                RefreshOutcome::Refreshed(count)
            }
            Err(e) => {
                error!(
                    "RefreshScheduler: Fetch failed, keeping previous snapshot of {} pairs: {}",
                    self.data_bus.latest().len(),
                    e
                );
                self.record_outcome("failure");
                RefreshOutcome::Failed(e)
            }
        };

        self.last_refresh_ms.store(completed_ms, Ordering::SeqCst);
        self.progress_bus.publish(100.0);

        outcome
    }

    /// Start the tick loop. Fetches are spawned separately so stopping the
    /// loop never cancels one that is already running.
    pub fn spawn(self: &Arc<Self>) -> SchedulerHandle {
        let scheduler = Arc::clone(self);
        let tick_period = self.settings.tick_period;

        let task = tokio::spawn(async move {
            info!(
                "RefreshScheduler started. Interval: {:?}, tick: {:?}",
                scheduler.settings.refresh_interval, tick_period
            );

            let mut ticker = tokio::time::interval(tick_period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let now_ms = chrono::Utc::now().timestamp_millis();
                if scheduler.tick_at(now_ms) {
                    let this = Arc::clone(&scheduler);
                    tokio::spawn(async move {
                        if let RefreshOutcome::Failed(e) = this.force_refresh().await {
                            warn!("RefreshScheduler: Scheduled refresh failed ({})", e.code);
                        }
                    });
                }
            }
        });

        SchedulerHandle { task }
    }

    /// Keep `last_updated` non-decreasing per symbol across snapshots
    fn stamp_snapshot(&self, mut pairs: Vec<TradingPair>, completed_ms: i64) -> Vec<TradingPair> {
        let previous = self.data_bus.latest();
        let previous_stamps: HashMap<&str, i64> = previous
            .iter()
            .map(|p| (p.symbol.as_str(), p.last_updated))
            .collect();

        for pair in &mut pairs {
            let floor = previous_stamps
                .get(pair.symbol.as_str())
                .copied()
                .unwrap_or(i64::MIN);
            pair.last_updated = pair.last_updated.max(completed_ms).max(floor);
        }

        pairs
    }

    fn record_outcome(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_refresh(outcome);
        }
    }
}

/// Handle to the running tick loop
pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop future ticks. An in-flight fetch still completes and publishes.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
