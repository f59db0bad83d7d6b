//! Configuration module for MarketPulse.
//!
//! Structured configuration loaded from environment variables, organized by
//! concern: Exchange, Scheduler, Prediction, and Observability. Every loader
//! also accepts an arbitrary key lookup so it can be exercised without
//! touching the process environment.

mod exchange_config;
mod observability_config;
mod prediction_config;
mod scheduler_config;

pub use exchange_config::{ExchangeEnvConfig, ExchangeMode};
pub use observability_config::ObservabilityEnvConfig;
pub use prediction_config::PredictionEnvConfig;
pub use scheduler_config::SchedulerEnvConfig;

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Key to value lookup, normally backed by `std::env::var`
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn parse_or<T>(lookup: Lookup, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Failed to parse {}: {}", key, e)),
        _ => Ok(default),
    }
}

pub(crate) fn parse_opt<T>(lookup: Lookup, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("Failed to parse {}: {}", key, e)),
        _ => Ok(None),
    }
}

pub(crate) fn parse_bool(lookup: Lookup, key: &str, default: bool) -> bool {
    lookup(key)
        .and_then(|raw| raw.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub exchange: ExchangeEnvConfig,
    pub scheduler: SchedulerEnvConfig,
    pub prediction: PredictionEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let exchange =
            ExchangeEnvConfig::from_lookup(lookup).context("Failed to load exchange config")?;
        let scheduler =
            SchedulerEnvConfig::from_lookup(lookup).context("Failed to load scheduler config")?;
        let prediction =
            PredictionEnvConfig::from_lookup(lookup).context("Failed to load prediction config")?;
        let observability = ObservabilityEnvConfig::from_lookup(lookup)
            .context("Failed to load observability config")?;

        Ok(Self {
            exchange,
            scheduler,
            prediction,
            observability,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    pub fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }
}
