//! Binance REST wire types

use crate::domain::market::candle::Candle;
use crate::domain::market::trading_pair::InstrumentInfo;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";
pub const TICKER_24H_PATH: &str = "/api/v3/ticker/24hr";
pub const KLINES_PATH: &str = "/api/v3/klines";
/// Largest `limit` the klines endpoint accepts
pub const MAX_KLINES: usize = 1000;

/// Entries are kept raw so one malformed symbol cannot sink the whole catalog
#[derive(Debug, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<serde_json::Value>,
}

impl ExchangeInfoResponse {
    pub fn instruments(self) -> Vec<InstrumentInfo> {
        decode_entries(self.symbols, "exchangeInfo symbol")
    }
}

/// Decode each entry on its own, dropping the ones that do not fit `T`
pub fn decode_entries<T: DeserializeOwned>(rows: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| serde_json::from_value(row).ok())
        .collect();

    if decoded.len() < total {
        warn!(
            "BinanceGateway: Dropped {} malformed {} entries",
            total - decoded.len(),
            what
        );
    }
    decoded
}

/// Parse one kline row `[openTime, open, high, low, close, volume, ...]`.
///
/// Prices arrive as decimal strings and are parsed exactly.
pub fn parse_kline(symbol: &str, row: &serde_json::Value) -> Option<Candle> {
    let arr = row.as_array()?;
    if arr.len() < 6 {
        return None;
    }

    let field = |i: usize| -> Option<Decimal> { Decimal::from_str(arr[i].as_str()?).ok() };

    Some(Candle {
        symbol: symbol.to_string(),
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
        timestamp: arr[0].as_i64()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::trading_pair::TickerSnapshot;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_kline_row() {
        let row = json!([
            1499040000000i64,
            "0.01634790",
            "0.80000000",
            "0.01575800",
            "0.01577100",
            "148976.11427815",
            1499644799999i64,
            "2434.19055334",
            308,
            "1756.87402397",
            "28.46694368",
            "0"
        ]);
        let candle = parse_kline("LTCBTC", &row).unwrap();
        assert_eq!(candle.timestamp, 1499040000000);
        assert_eq!(candle.open, dec!(0.01634790));
        assert_eq!(candle.close, dec!(0.01577100));
        assert_eq!(candle.volume, dec!(148976.11427815));
    }

    #[test]
    fn test_malformed_kline_rows_are_rejected() {
        assert!(parse_kline("X", &json!([1, "1", "2"])).is_none());
        assert!(parse_kline("X", &json!([1, "a", "2", "1", "1", "1"])).is_none());
        assert!(parse_kline("X", &json!({"open": "1"})).is_none());
    }

    #[test]
    fn test_exchange_info_ignores_extra_fields() {
        let body = r#"{
            "timezone": "UTC",
            "symbols": [{
                "symbol": "ETHBTC",
                "status": "TRADING",
                "baseAsset": "ETH",
                "quoteAsset": "BTC",
                "isSpotTradingAllowed": true,
                "filters": []
            }]
        }"#;
        let info: ExchangeInfoResponse = serde_json::from_str(body).unwrap();
        let instruments = info.instruments();
        assert_eq!(instruments.len(), 1);
        assert!(instruments[0].is_tradeable());
    }

    #[test]
    fn test_bad_ticker_entry_dropped_good_ones_kept() {
        let body = r#"[
            {"symbol":"BTCUSDT","lastPrice":"96000.00","priceChangePercent":"2.1","quoteVolume":"1850000000"},
            {"symbol":"ETHUSDT","lastPrice":null,"priceChangePercent":"1.0","quoteVolume":"900000000"},
            {"symbol":"SOLUSDT","lastPrice":"150.00","priceChangePercent":"4.8"},
            {"symbol":"XRPUSDT","lastPrice":"2.10","priceChangePercent":"0.5","quoteVolume":"300000000"}
        ]"#;
        let rows: Vec<serde_json::Value> = serde_json::from_str(body).unwrap();
        let tickers: Vec<TickerSnapshot> = decode_entries(rows, "24hr ticker");

        let symbols: Vec<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "XRPUSDT"]);
    }

    #[test]
    fn test_bad_catalog_entry_dropped() {
        let body = r#"{"symbols": [
            {"symbol":"ETHBTC","status":"TRADING","baseAsset":"ETH","quoteAsset":"BTC","isSpotTradingAllowed":true},
            {"symbol":"BROKEN","status":7}
        ]}"#;
        let info: ExchangeInfoResponse = serde_json::from_str(body).unwrap();
        let instruments = info.instruments();
        assert_eq!(instruments.len(), 1);
        assert_eq!(instruments[0].symbol, "ETHBTC");
    }
}
