use crate::domain::market::timeframe::Timeframe;
use chrono::{DateTime, Timelike, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Window after which daily predictions may be generated (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub hour_utc: u32,
    pub window_minutes: u32,
}

impl Default for DailyWindow {
    fn default() -> Self {
        Self {
            hour_utc: 0,
            window_minutes: 10,
        }
    }
}

impl DailyWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let minute_of_day = now.hour() * 60 + now.minute();
        let start = self.hour_utc * 60;
        minute_of_day >= start && minute_of_day < start + self.window_minutes
    }
}

/// Whether a timeframe is due for a new prediction.
///
/// Sub-daily timeframes are due once a full timeframe has elapsed since the
/// last generation. Daily is due only inside the daily window and only once
/// per UTC calendar day.
pub fn should_generate(
    timeframe: Timeframe,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: &DailyWindow,
) -> bool {
    if timeframe.is_daily() {
        if !window.contains(now) {
            return false;
        }
        return match last {
            Some(last) => last.date_naive() != now.date_naive(),
            None => true,
        };
    }

    match last {
        Some(last) => (now - last).num_milliseconds() >= timeframe.to_millis(),
        None => true,
    }
}

/// Last generation time per timeframe, shared across prediction passes
#[derive(Debug, Default)]
pub struct PredictionGate {
    window: DailyWindow,
    last_generated: RwLock<HashMap<Timeframe, DateTime<Utc>>>,
}

impl PredictionGate {
    pub fn new(window: DailyWindow) -> Self {
        Self {
            window,
            last_generated: RwLock::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> DailyWindow {
        self.window
    }

    pub fn last_generated(&self, timeframe: Timeframe) -> Option<DateTime<Utc>> {
        let map = match self.last_generated.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(&timeframe).copied()
    }

    pub fn is_due(&self, timeframe: Timeframe, now: DateTime<Utc>) -> bool {
        should_generate(timeframe, self.last_generated(timeframe), now, &self.window)
    }

    /// Mark a timeframe pass as complete
    pub fn record(&self, timeframe: Timeframe, at: DateTime<Utc>) {
        let mut map = match self.last_generated.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.insert(timeframe, at);
    }
}
