pub mod binance;
pub mod core;
pub mod csv_candles;
pub mod factory;
pub mod mock;
pub mod observability;
pub mod repositories;

pub use csv_candles::CsvCandleSource;
pub use factory::ServiceFactory;
pub use repositories::InMemoryPredictionRepository;
