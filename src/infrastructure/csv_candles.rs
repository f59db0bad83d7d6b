//! Offline inputs loaded from CSV.
//!
//! Candle history expects the header
//! `symbol,interval,timestamp,open,high,low,close,volume` with `interval` in
//! exchange notation (`1h`, `4h`, `1d`, ...) and `timestamp` in epoch
//! milliseconds. Rows may appear in any order.
//!
//! Market caps expect `symbol,market_cap`; a later row for the same symbol
//! wins.

use crate::domain::errors::ServiceError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::CandleSource;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Deserialize)]
struct CandleRecord {
    symbol: String,
    interval: String,
    timestamp: i64,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

impl CandleRecord {
    fn into_candle(self, line: usize) -> Result<(Timeframe, Candle), ServiceError> {
        let timeframe = Timeframe::from_str(&self.interval).map_err(|e| {
            ServiceError::invalid_input(format!("line {}: {}", line, e))
        })?;
        let price = |field: &str, raw: &str| -> Result<Decimal, ServiceError> {
            Decimal::from_str(raw.trim()).map_err(|e| {
                ServiceError::invalid_input(format!("line {}: bad {} '{}': {}", line, field, raw, e))
            })
        };

        let candle = Candle {
            open: price("open", &self.open)?,
            high: price("high", &self.high)?,
            low: price("low", &self.low)?,
            close: price("close", &self.close)?,
            volume: price("volume", &self.volume)?,
            timestamp: self.timestamp,
            symbol: self.symbol,
        };
        Ok((timeframe, candle))
    }
}

#[derive(Debug, Deserialize)]
struct MarketCapRecord {
    symbol: String,
    market_cap: f64,
}

/// Read a `symbol,market_cap` table
pub fn read_market_caps<R: Read>(reader: R) -> Result<HashMap<String, f64>, ServiceError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut caps = HashMap::new();

    for (i, result) in rdr.deserialize().enumerate() {
        let record: MarketCapRecord = result?;
        if !record.market_cap.is_finite() || record.market_cap < 0.0 {
            return Err(ServiceError::invalid_input(format!(
                "line {}: bad market_cap {} for {}",
                i + 2,
                record.market_cap,
                record.symbol
            )));
        }
        caps.insert(record.symbol.to_uppercase(), record.market_cap);
    }

    Ok(caps)
}

pub fn load_market_caps(path: impl AsRef<Path>) -> Result<HashMap<String, f64>, ServiceError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        ServiceError::invalid_input(format!("Cannot open {}: {}", path.display(), e))
    })?;
    let caps = read_market_caps(file)?;
    info!("Loaded {} market caps from {}", caps.len(), path.display());
    Ok(caps)
}

pub struct CsvCandleSource {
    series: HashMap<(String, Timeframe), Vec<Candle>>,
}

impl CsvCandleSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            ServiceError::invalid_input(format!("Cannot open {}: {}", path.display(), e))
        })?;
        let source = Self::from_reader(file)?;
        info!(
            "CsvCandleSource: Loaded {} series from {}",
            source.series.len(),
            path.display()
        );
        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ServiceError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut series: HashMap<(String, Timeframe), Vec<Candle>> = HashMap::new();

        for (i, result) in rdr.deserialize().enumerate() {
            let record: CandleRecord = result?;
            // header is line 1
            let (timeframe, candle) = record.into_candle(i + 2)?;
            series
                .entry((candle.symbol.clone(), timeframe))
                .or_default()
                .push(candle);
        }

        for candles in series.values_mut() {
            candles.sort_by_key(|c| c.timestamp);
            candles.dedup_by_key(|c| c.timestamp);
        }

        Ok(Self { series })
    }

    /// Distinct symbols present in the file, sorted
    pub fn symbols(&self) -> Vec<String> {
        self.series
            .keys()
            .map(|(symbol, _)| symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[async_trait]
impl CandleSource for CsvCandleSource {
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ServiceError> {
        let Some(candles) = self.series.get(&(symbol.to_string(), timeframe)) else {
            return Ok(Vec::new());
        };
        let start = candles.len().saturating_sub(limit);
        Ok(candles[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
symbol,interval,timestamp,open,high,low,close,volume
BTCUSDT,1h,7200000,101,103,100,102.5,12
BTCUSDT,1h,3600000,100,102,99,101,10
BTCUSDT,1h,7200000,101,103,100,102.5,12
ETHUSDT,4h,0,3000,3050,2990,3010.25,500
BTCUSDT,1d,0,90000,97000,89000,96000,4000
";

    #[tokio::test]
    async fn test_series_sorted_and_deduplicated() {
        let source = CsvCandleSource::from_reader(SAMPLE.as_bytes()).unwrap();
        let candles = source.get_candles("BTCUSDT", Timeframe::OneHour, 100).await.unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 3_600_000);
        assert_eq!(candles[1].close, dec!(102.5));
    }

    #[tokio::test]
    async fn test_limit_keeps_most_recent() {
        let source = CsvCandleSource::from_reader(SAMPLE.as_bytes()).unwrap();
        let candles = source.get_candles("BTCUSDT", Timeframe::OneHour, 1).await.unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, 7_200_000);
    }

    #[tokio::test]
    async fn test_unknown_series_is_empty() {
        let source = CsvCandleSource::from_reader(SAMPLE.as_bytes()).unwrap();
        let candles = source.get_candles("ETHUSDT", Timeframe::OneHour, 10).await.unwrap();
        assert!(candles.is_empty());
        assert_eq!(source.symbols(), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_bad_rows_are_invalid_input() {
        let bad_interval = "symbol,interval,timestamp,open,high,low,close,volume\nX,7x,0,1,1,1,1,1\n";
        let err = CsvCandleSource::from_reader(bad_interval.as_bytes())
            .err()
            .unwrap();
        assert_eq!(err.status, 400);
        assert!(err.message.contains("line 2"));

        let bad_price = "symbol,interval,timestamp,open,high,low,close,volume\nX,1h,0,abc,1,1,1,1\n";
        assert!(CsvCandleSource::from_reader(bad_price.as_bytes()).is_err());

        let missing_column = "symbol,interval,timestamp\nX,1h,0\n";
        assert!(CsvCandleSource::from_reader(missing_column.as_bytes()).is_err());
    }

    #[test]
    fn test_market_caps_table() {
        let table = "symbol,market_cap\nbtcusdt,1900000000000\nETHUSDT,410000000000\nETHUSDT,420000000000\n";
        let caps = read_market_caps(table.as_bytes()).unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(caps["BTCUSDT"], 1.9e12);
        assert_eq!(caps["ETHUSDT"], 4.2e11);

        let negative = "symbol,market_cap\nX,-1\n";
        let err = read_market_caps(negative.as_bytes()).err().unwrap();
        assert!(err.message.contains("line 2"));

        assert!(read_market_caps("symbol,market_cap\nX,lots\n".as_bytes()).is_err());
    }
}
