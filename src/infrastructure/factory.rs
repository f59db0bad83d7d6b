use crate::config::{ExchangeEnvConfig, ExchangeMode};
use crate::domain::ports::{CandleSource, ExchangeGateway};
use crate::infrastructure::binance::BinanceGateway;
use crate::infrastructure::mock::{MockCandleSource, MockExchangeGateway};
use std::sync::Arc;
use tracing::info;

pub struct ServiceFactory;

impl ServiceFactory {
    /// Ticker gateway and candle source for the configured exchange mode
    pub fn create_market_services(
        config: &ExchangeEnvConfig,
    ) -> (Arc<dyn ExchangeGateway>, Arc<dyn CandleSource>) {
        match config.mode {
            ExchangeMode::Mock => {
                info!("ServiceFactory: Using mock exchange");
                (
                    Arc::new(MockExchangeGateway::with_default_pairs()),
                    Arc::new(MockCandleSource::default()),
                )
            }
            ExchangeMode::Binance => {
                info!("ServiceFactory: Using Binance at {}", config.base_url);
                let gateway = Arc::new(
                    BinanceGateway::builder()
                        .base_url(config.base_url.clone())
                        .api_key(config.api_key.clone())
                        .http_settings(config.http_settings())
                        .build(),
                );
                (gateway.clone(), gateway)
            }
        }
    }
}
