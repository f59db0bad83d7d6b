use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocityTrend {
    Accelerating,
    Decelerating,
    Stable,
}

impl fmt::Display for VelocityTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VelocityTrend::Accelerating => write!(f, "accelerating"),
            VelocityTrend::Decelerating => write!(f, "decelerating"),
            VelocityTrend::Stable => write!(f, "stable"),
        }
    }
}

/// Normalized market snapshot for one tradeable pair.
///
/// A refresh cycle always produces a complete new set of pairs; records are
/// never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPair {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub price: f64,
    pub price_change_24h: f64,
    pub volume_24h: f64,
    pub market_cap: Option<f64>,
    pub order_book_imbalance: f64,
    pub price_velocity: f64,
    pub velocity_trend: VelocityTrend,
    pub pump_probability: f64,
    /// Epoch milliseconds
    pub last_updated: i64,
}

/// Instrument catalog entry as exposed by the exchange
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub status: String,
    #[serde(default)]
    pub is_spot_trading_allowed: bool,
}

impl InstrumentInfo {
    pub fn is_tradeable(&self) -> bool {
        self.status == "TRADING" && self.is_spot_trading_allowed
    }
}

/// 24h rolling ticker. Numeric fields arrive as strings on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerSnapshot {
    pub symbol: String,
    pub last_price: String,
    pub price_change_percent: String,
    pub quote_volume: String,
}

/// Parsed numeric view of a ticker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerStats {
    pub price: f64,
    pub price_change_pct: f64,
    pub quote_volume: f64,
}

impl TickerSnapshot {
    /// Returns None when any field is unparsable or non-finite
    pub fn parse_stats(&self) -> Option<TickerStats> {
        let price = self.last_price.parse::<f64>().ok()?;
        let price_change_pct = self.price_change_percent.parse::<f64>().ok()?;
        let quote_volume = self.quote_volume.parse::<f64>().ok()?;

        if !(price.is_finite() && price_change_pct.is_finite() && quote_volume.is_finite()) {
            return None;
        }

        Some(TickerStats {
            price,
            price_change_pct,
            quote_volume,
        })
    }
}
