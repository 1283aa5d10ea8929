//! Recurring check configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::application::scheduler::SchedulerConfig;
use crate::domain::BarPeriod;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub interval_secs: u64,
    pub max_concurrent_checks: usize,
    pub period: BarPeriod,
    /// Bars fetched per check.
    pub bars: usize,
    /// How far a bar timestamp may step backwards before the series is
    /// rejected as non-monotonic.
    pub timestamp_tolerance_secs: u64,
    pub start_jitter_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            max_concurrent_checks: 16,
            period: BarPeriod::Daily,
            bars: 120,
            timestamp_tolerance_secs: 0,
            start_jitter_ms: 0,
        }
    }
}

impl SchedulerSection {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Tolerance in the evaluator's clock units. Saturates at
    /// [`chrono::Duration::MAX`].
    #[must_use]
    pub fn timestamp_tolerance(&self) -> chrono::Duration {
        i64::try_from(self.timestamp_tolerance_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    #[must_use]
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: self.interval(),
            max_concurrent_checks: self.max_concurrent_checks,
            period: self.period,
            bars: self.bars,
            start_jitter: Duration::from_millis(self.start_jitter_ms),
        }
    }
}
