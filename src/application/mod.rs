// Technical indicators over candle history
pub mod indicators;

// Live ticker refresh pipeline
pub mod market_data;

// Candlestick and volume pattern recognition
pub mod patterns;

// Heuristic predictions and top-pick aggregation
pub mod prediction;

// System orchestrator
pub mod system;
