//! Exchange configuration parsing from environment variables.

use super::{Lookup, parse_or};
use crate::application::market_data::PairFilter;
use crate::infrastructure::core::HttpClientSettings;
use anyhow::{Result, ensure};
use std::str::FromStr;
use std::time::Duration;

/// Where market data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeMode {
    Binance,
    Mock,
}

impl FromStr for ExchangeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Ok(ExchangeMode::Binance),
            "mock" => Ok(ExchangeMode::Mock),
            _ => anyhow::bail!("Invalid EXCHANGE_MODE: {}. Must be 'binance' or 'mock'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeEnvConfig {
    pub mode: ExchangeMode,
    pub base_url: String,
    pub api_key: Option<String>,
    pub quote_currency: String,
    pub min_quote_volume: f64,
    pub max_pairs: usize,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
}

impl ExchangeEnvConfig {
    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let config = Self {
            mode: parse_or(lookup, "EXCHANGE_MODE", ExchangeMode::Binance)?,
            base_url: lookup("BINANCE_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "https://api.binance.com".to_string()),
            api_key: lookup("BINANCE_API_KEY").filter(|v| !v.trim().is_empty()),
            quote_currency: lookup("QUOTE_CURRENCY")
                .map(|v| v.trim().to_uppercase())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "USDT".to_string()),
            min_quote_volume: parse_or(lookup, "MIN_QUOTE_VOLUME", 1_000_000.0)?,
            max_pairs: parse_or(lookup, "MAX_PAIRS", 100)?,
            http_timeout_secs: parse_or(lookup, "HTTP_TIMEOUT_SECS", 10)?,
            http_max_retries: parse_or(lookup, "HTTP_MAX_RETRIES", 2)?,
        };

        ensure!(
            config.min_quote_volume >= 0.0,
            "MIN_QUOTE_VOLUME must be non-negative, got {}",
            config.min_quote_volume
        );
        ensure!(config.max_pairs > 0, "MAX_PAIRS must be at least 1");
        ensure!(config.http_timeout_secs > 0, "HTTP_TIMEOUT_SECS must be at least 1");

        Ok(config)
    }

    pub fn pair_filter(&self) -> PairFilter {
        PairFilter {
            quote_currency: self.quote_currency.clone(),
            min_quote_volume: self.min_quote_volume,
            max_pairs: self.max_pairs,
        }
    }

    pub fn http_settings(&self) -> HttpClientSettings {
        HttpClientSettings {
            timeout: Duration::from_secs(self.http_timeout_secs),
            max_retries: self.http_max_retries,
            ..HttpClientSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::lookup_from;

    #[test]
    fn test_exchange_config_defaults() {
        let config = ExchangeEnvConfig::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config.mode, ExchangeMode::Binance);
        assert_eq!(config.base_url, "https://api.binance.com");
        assert!(config.api_key.is_none());
        assert_eq!(config.pair_filter(), PairFilter::default());
        assert_eq!(config.http_settings(), HttpClientSettings::default());
    }

    #[test]
    fn test_exchange_config_overrides() {
        let config = ExchangeEnvConfig::from_lookup(&lookup_from(&[
            ("EXCHANGE_MODE", "MOCK"),
            ("BINANCE_API_KEY", "abc"),
            ("QUOTE_CURRENCY", "fdusd"),
            ("MAX_PAIRS", "25"),
            ("HTTP_MAX_RETRIES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.mode, ExchangeMode::Mock);
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.pair_filter().quote_currency, "FDUSD");
        assert_eq!(config.pair_filter().max_pairs, 25);
        assert_eq!(config.http_settings().max_retries, 0);
    }

    #[test]
    fn test_exchange_config_rejects_bad_values() {
        assert!(ExchangeEnvConfig::from_lookup(&lookup_from(&[("EXCHANGE_MODE", "kraken")])).is_err());
        assert!(ExchangeEnvConfig::from_lookup(&lookup_from(&[("MAX_PAIRS", "0")])).is_err());
        assert!(
            ExchangeEnvConfig::from_lookup(&lookup_from(&[("MIN_QUOTE_VOLUME", "-1")])).is_err()
        );
    }
}
