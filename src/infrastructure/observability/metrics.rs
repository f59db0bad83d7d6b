//! Prometheus metrics definitions for MarketPulse
//!
//! All metrics use the `marketpulse_` prefix.

use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Refresh attempts by outcome (success, failure, coalesced)
    pub refresh_total: CounterVec,
    /// Wall time of a market data fetch
    pub fetch_duration_seconds: Histogram,
    /// Pairs in the latest published snapshot
    pub tracked_pairs: Gauge,
    /// Prediction attempts by timeframe and outcome (generated, skipped, failed)
    pub predictions_total: CounterVec,
    /// Completed top-pick aggregation passes
    pub top_pick_passes_total: Counter,
    /// Picks selected by the latest aggregation pass
    pub top_picks_current: Gauge,
    /// Uptime in seconds
    pub uptime_seconds: Gauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let refresh_total = CounterVec::new(
            Opts::new(
                "marketpulse_refresh_total",
                "Market data refresh attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(refresh_total.clone()))?;

        let fetch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "marketpulse_fetch_duration_seconds",
                "Market data fetch duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(fetch_duration_seconds.clone()))?;

        let tracked_pairs = Gauge::with_opts(Opts::new(
            "marketpulse_tracked_pairs",
            "Trading pairs in the current snapshot",
        ))?;
        registry.register(Box::new(tracked_pairs.clone()))?;

        let predictions_total = CounterVec::new(
            Opts::new(
                "marketpulse_predictions_total",
                "Prediction attempts by timeframe and outcome",
            ),
            &["timeframe", "outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let top_pick_passes_total = Counter::with_opts(Opts::new(
            "marketpulse_top_pick_passes_total",
            "Completed top pick aggregation passes",
        ))?;
        registry.register(Box::new(top_pick_passes_total.clone()))?;

        let top_picks_current = Gauge::with_opts(Opts::new(
            "marketpulse_top_picks_current",
            "Top picks selected by the latest pass",
        ))?;
        registry.register(Box::new(top_picks_current.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "marketpulse_uptime_seconds",
            "Process uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            refresh_total,
            fetch_duration_seconds,
            tracked_pairs,
            predictions_total,
            top_pick_passes_total,
            top_picks_current,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_refresh(&self, outcome: &str) {
        self.refresh_total.with_label_values(&[outcome]).inc();
    }

    pub fn refresh_count(&self, outcome: &str) -> f64 {
        self.refresh_total.with_label_values(&[outcome]).get()
    }

    pub fn inc_predictions(&self, timeframe: &str, outcome: &str, by: u64) {
        self.predictions_total
            .with_label_values(&[timeframe, outcome])
            .inc_by(by as f64);
    }

    pub fn prediction_count(&self, timeframe: &str, outcome: &str) -> f64 {
        self.predictions_total
            .with_label_values(&[timeframe, outcome])
            .get()
    }

    pub fn record_top_picks(&self, count: usize) {
        self.top_pick_passes_total.inc();
        self.top_picks_current.set(count as f64);
    }
}
