use super::{Lookup, parse_or};
use crate::application::market_data::SchedulerSettings;
use anyhow::{Result, ensure};
use std::time::Duration;

/// Refresh cadence for the pair snapshot
#[derive(Debug, Clone)]
pub struct SchedulerEnvConfig {
    pub refresh_interval_secs: u64,
    pub tick_ms: u64,
}

impl SchedulerEnvConfig {
    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let refresh_interval_secs = parse_or(lookup, "REFRESH_INTERVAL_SECS", 30)?;
        let tick_ms = parse_or(lookup, "TICK_MS", 1000)?;

        ensure!(refresh_interval_secs > 0, "REFRESH_INTERVAL_SECS must be at least 1");
        ensure!(tick_ms > 0, "TICK_MS must be at least 1");

        Ok(Self {
            refresh_interval_secs,
            tick_ms,
        })
    }

    pub fn settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            tick_period: Duration::from_millis(self.tick_ms),
        }
    }
}
