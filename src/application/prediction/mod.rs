// Heuristic predictions and top-pick aggregation
pub mod engine;
pub mod gating;
pub mod service;
pub mod strategy;
pub mod top_picks;

pub use engine::{PredictionEngine, PredictionSettings, TimeframeReport};
pub use gating::{DailyWindow, PredictionGate, should_generate};
pub use service::{PassSummary, PredictionHandle, PredictionService};
pub use strategy::{
    HeuristicRange, HeuristicTable, PredictionStrategy, TrendVolumeHeuristic,
    apply_volatility_adjustment,
};
pub use top_picks::{MarketCapBand, TopPicksAggregator, TopPicksConfig, select_top_picks};
