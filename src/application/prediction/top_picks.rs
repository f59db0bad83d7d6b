//! Cross-timeframe aggregation of stored predictions into a ranked top-pick list.

use crate::domain::market::timeframe::Timeframe;
use crate::domain::prediction::{RankedPrediction, TopPick, round2};
use crate::domain::repositories::PredictionRepository;
use crate::infrastructure::observability::Metrics;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Market-cap filter applied before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct MarketCapBand {
    pub min: f64,
    /// `None` means unbounded
    pub max: Option<f64>,
    /// Reject pairs whose market cap is unknown
    pub require_known: bool,
}

impl Default for MarketCapBand {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: None,
            require_known: false,
        }
    }
}

impl MarketCapBand {
    /// Whether the band can reject anything once caps are known
    pub fn filters_by_cap(&self) -> bool {
        self.require_known || self.min > 0.0 || self.max.is_some()
    }

    pub fn contains(&self, market_cap: Option<f64>) -> bool {
        match market_cap {
            Some(cap) => cap >= self.min && self.max.is_none_or(|max| cap <= max),
            None => !self.require_known,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopPicksConfig {
    pub band: MarketCapBand,
    pub top_k: usize,
    pub timeframes: Vec<Timeframe>,
    /// Stored predictions pulled per timeframe
    pub candidates_per_timeframe: usize,
}

impl Default for TopPicksConfig {
    fn default() -> Self {
        Self {
            band: MarketCapBand::default(),
            top_k: 10,
            timeframes: vec![Timeframe::OneHour, Timeframe::FourHour, Timeframe::OneDay],
            candidates_per_timeframe: 100,
        }
    }
}

/// Keep each pair's best-scoring timeframe inside the band, then rank globally.
pub fn select_top_picks(
    candidates: &[RankedPrediction],
    band: &MarketCapBand,
    top_k: usize,
) -> Vec<TopPick> {
    let mut best: HashMap<&str, &RankedPrediction> = HashMap::new();

    for candidate in candidates.iter().filter(|c| band.contains(c.market_cap)) {
        let pair = candidate.prediction.trading_pair.as_str();
        match best.get(pair) {
            Some(current) if current.prediction.score() >= candidate.prediction.score() => {}
            _ => {
                best.insert(pair, candidate);
            }
        }
    }

    let mut picks: Vec<TopPick> = best
        .into_values()
        .map(|c| {
            let p = &c.prediction;
            let total_score = round2(p.score());
            TopPick {
                trading_pair: p.trading_pair.clone(),
                market_cap: c.market_cap,
                total_score,
                best_timeframe: p.timeframe,
                best_prediction: p.predicted_change_pct,
                best_confidence: p.confidence_score,
                selection_reason: format!(
                    "Strongest on {}: {:+.2}% expected at {:.2}% confidence (score {:.2})",
                    p.timeframe, p.predicted_change_pct, p.confidence_score, total_score
                ),
            }
        })
        .collect();

    picks.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.trading_pair.cmp(&b.trading_pair))
    });
    picks.truncate(top_k);
    picks
}

pub struct TopPicksAggregator {
    repository: Arc<dyn PredictionRepository>,
    config: TopPicksConfig,
    metrics: Option<Metrics>,
}

impl TopPicksAggregator {
    pub fn new(repository: Arc<dyn PredictionRepository>, config: TopPicksConfig) -> Self {
        Self {
            repository,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &TopPicksConfig {
        &self.config
    }

    /// Recompute the whole pick list and push each pick to the repository.
    ///
    /// A timeframe whose predictions cannot be read is left out of this pass.
    pub async fn refresh(&self) -> Vec<TopPick> {
        let mut candidates = Vec::new();
        for &timeframe in &self.config.timeframes {
            match self
                .repository
                .get_top_predictions(timeframe, self.config.candidates_per_timeframe)
                .await
            {
                Ok(mut ranked) => candidates.append(&mut ranked),
                Err(e) => warn!(
                    "TopPicksAggregator: Could not load {} predictions: {}",
                    timeframe, e
                ),
            }
        }

        let picks = select_top_picks(&candidates, &self.config.band, self.config.top_k);

        for pick in &picks {
            if let Err(e) = self
                .repository
                .update_top_pick(
                    &pick.trading_pair,
                    pick.market_cap,
                    &pick.selection_reason,
                    pick.best_timeframe,
                    pick.best_confidence,
                )
                .await
            {
                warn!(
                    "TopPicksAggregator: Failed to store pick {}: {}",
                    pick.trading_pair, e
                );
            }
        }

        info!(
            "TopPicksAggregator: {} picks from {} candidates",
            picks.len(),
            candidates.len()
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_top_picks(picks.len());
        }

        picks
    }
}
