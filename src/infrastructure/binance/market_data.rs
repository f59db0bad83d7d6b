//! Binance Market Data Gateway
//!
//! Read-only access to the public Binance REST API:
//! - Instrument catalog (exchangeInfo)
//! - 24h rolling tickers
//! - Historical candles (klines)

use super::common::{
    DEFAULT_BASE_URL, EXCHANGE_INFO_PATH, ExchangeInfoResponse, KLINES_PATH, MAX_KLINES,
    TICKER_24H_PATH, decode_entries, parse_kline,
};
use crate::domain::errors::ServiceError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::market::trading_pair::{InstrumentInfo, TickerSnapshot};
use crate::domain::ports::{CandleSource, ExchangeGateway};
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpClientSettings, build_url_with_query,
};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

pub struct BinanceGateway {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
}

impl BinanceGateway {
    pub fn builder() -> BinanceGatewayBuilder {
        BinanceGatewayBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, ServiceError> {
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("X-MBX-APIKEY", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                "BinanceGateway: {} returned {}: {}",
                what,
                status.as_u16(),
                error_text
            );
            return Err(ServiceError::upstream(
                status.as_u16(),
                format!("Binance {} fetch failed", what),
            )
            .with_details(serde_json::json!({ "body": error_text })));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ServiceError::malformed(format!("Failed to parse Binance {}: {}", what, e))
        })
    }
}

#[derive(Default)]
pub struct BinanceGatewayBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    http: Option<HttpClientSettings>,
}

impl BinanceGatewayBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Public endpoints work without a key; one only raises rate limits
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn http_settings(mut self, settings: HttpClientSettings) -> Self {
        self.http = Some(settings);
        self
    }

    pub fn build(self) -> BinanceGateway {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let client = HttpClientFactory::create_client(&self.http.unwrap_or_default());

        BinanceGateway {
            client,
            base_url,
            api_key: self.api_key,
        }
    }
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    async fn fetch_instruments(&self) -> Result<Vec<InstrumentInfo>, ServiceError> {
        let url = format!("{}{}", self.base_url, EXCHANGE_INFO_PATH);
        let info: ExchangeInfoResponse = self.get_json(&url, "exchangeInfo").await?;
        let instruments = info.instruments();
        debug!("BinanceGateway: {} instruments", instruments.len());
        Ok(instruments)
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerSnapshot>, ServiceError> {
        let url = format!("{}{}", self.base_url, TICKER_24H_PATH);
        let rows: Vec<serde_json::Value> = self.get_json(&url, "24hr ticker").await?;
        let tickers: Vec<TickerSnapshot> = decode_entries(rows, "24hr ticker");
        debug!("BinanceGateway: {} tickers", tickers.len());
        Ok(tickers)
    }
}

#[async_trait]
impl CandleSource for BinanceGateway {
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ServiceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}{}", self.base_url, KLINES_PATH);
        let limit_str = limit.min(MAX_KLINES).to_string();
        let url_with_query = build_url_with_query(
            &url,
            &[
                ("symbol", symbol),
                ("interval", timeframe.to_binance_string()),
                ("limit", limit_str.as_str()),
            ],
        );

        let rows: Vec<serde_json::Value> = self.get_json(&url_with_query, "klines").await?;
        let total = rows.len();
        let candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| parse_kline(symbol, row))
            .collect();

        if candles.len() < total {
            warn!(
                "BinanceGateway: Dropped {} malformed klines for {}",
                total - candles.len(),
                symbol
            );
        }
        info!(
            "BinanceGateway: Fetched {} {} bars for {}",
            candles.len(),
            timeframe,
            symbol
        );

        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_and_trailing_slash() {
        let gateway = BinanceGateway::builder().build();
        assert_eq!(gateway.base_url(), DEFAULT_BASE_URL);

        let custom = BinanceGateway::builder()
            .base_url("https://testnet.binance.vision/")
            .api_key(Some(String::new()))
            .build();
        assert_eq!(custom.base_url(), "https://testnet.binance.vision");
        assert!(custom.api_key.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let gateway = BinanceGateway::builder()
            .base_url("http://127.0.0.1:1")
            .http_settings(HttpClientSettings {
                max_retries: 0,
                ..HttpClientSettings::default()
            })
            .build();

        let err = gateway.fetch_tickers().await.unwrap_err();
        assert_eq!(err.code, crate::domain::errors::ErrorCode::Network);
    }

    #[tokio::test]
    async fn test_zero_limit_skips_request() {
        let gateway = BinanceGateway::builder().base_url("http://127.0.0.1:1").build();
        let candles = gateway
            .get_candles("BTCUSDT", Timeframe::OneHour, 0)
            .await
            .unwrap();
        assert!(candles.is_empty());
    }
}
