//! Observability configuration parsing from environment variables.

use super::{Lookup, parse_bool, parse_or};
use anyhow::Result;
use std::time::Duration;

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub metrics_enabled: bool,
    pub report_interval_secs: u64,
}

impl ObservabilityEnvConfig {
    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        Ok(Self {
            metrics_enabled: parse_bool(lookup, "METRICS_ENABLED", true),
            report_interval_secs: parse_or(lookup, "METRICS_REPORT_INTERVAL_SECS", 60)?,
        })
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }
}
