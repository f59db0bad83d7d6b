pub mod candle;
pub mod pattern;
pub mod timeframe;
pub mod trading_pair;
