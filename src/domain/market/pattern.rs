use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternAction {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for PatternAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternAction::Buy => write!(f, "buy"),
            PatternAction::Sell => write!(f, "sell"),
            PatternAction::Neutral => write!(f, "neutral"),
        }
    }
}

/// Candle or trend pattern match. Several may hold for the same window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Tag such as `doji` or `bullish_engulfing`
    pub kind: String,
    /// 0-100, fixed per kind
    pub confidence: u8,
    pub description: String,
    pub action: PatternAction,
}
