//! Per-check evaluation results.
//!
//! An [`EvaluationResult`] is ephemeral: it is returned to the caller and
//! handed to the dispatcher, but only the trigger bookkeeping it causes is
//! persisted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::condition::{Comparator, Condition, CrossDirection, IndicatorKind};

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Notification category of an alert, matched against the owner's
/// `notification_types` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    GoldenCross,
    DeathCross,
    RsiOverbought,
    RsiOversold,
    MacdGoldenCross,
    MacdDeathCross,
    PriceBreakout,
    PriceBreakdown,
    VolumeBreakout,
    Custom,
}

impl AlertKind {
    pub const ALL: [AlertKind; 10] = [
        AlertKind::GoldenCross,
        AlertKind::DeathCross,
        AlertKind::RsiOverbought,
        AlertKind::RsiOversold,
        AlertKind::MacdGoldenCross,
        AlertKind::MacdDeathCross,
        AlertKind::PriceBreakout,
        AlertKind::PriceBreakdown,
        AlertKind::VolumeBreakout,
        AlertKind::Custom,
    ];

    /// Stable key used in notification settings.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::GoldenCross => "golden_cross",
            Self::DeathCross => "death_cross",
            Self::RsiOverbought => "rsi_overbought",
            Self::RsiOversold => "rsi_oversold",
            Self::MacdGoldenCross => "macd_golden_cross",
            Self::MacdDeathCross => "macd_death_cross",
            Self::PriceBreakout => "price_breakout",
            Self::PriceBreakdown => "price_breakdown",
            Self::VolumeBreakout => "volume_breakout",
            Self::Custom => "custom",
        }
    }

    /// Category an alert for `condition` falls into.
    #[must_use]
    pub fn for_condition(condition: &Condition) -> Self {
        match condition {
            Condition::MaCross { direction, .. } => match direction {
                CrossDirection::Up => Self::GoldenCross,
                CrossDirection::Down => Self::DeathCross,
            },
            Condition::MacdCross { direction, .. } => match direction {
                CrossDirection::Up => Self::MacdGoldenCross,
                CrossDirection::Down => Self::MacdDeathCross,
            },
            Condition::RsiThreshold { comparator, .. } => match comparator {
                Comparator::Above => Self::RsiOverbought,
                Comparator::Below => Self::RsiOversold,
            },
            Condition::PriceBreakout { comparator, .. } => match comparator {
                Comparator::Above => Self::PriceBreakout,
                Comparator::Below => Self::PriceBreakdown,
            },
            Condition::VolumeSpike { .. } => Self::VolumeBreakout,
            Condition::Custom { .. } => Self::Custom,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One satisfied condition, ready to be formatted into a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub indicator: IndicatorKind,
    pub kind: AlertKind,
    pub severity: Severity,
    /// Label of the condition that fired, e.g. `MA_CROSS(5,10,up)`.
    pub condition: String,
    pub message: String,
}

/// Outcome of evaluating a monitor's conditions against one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub triggered: bool,
    pub alerts: Vec<Alert>,
    /// Timestamp of the last bar evaluated.
    pub evaluated_at: DateTime<Utc>,
    /// Close of the last bar evaluated.
    pub latest_price: f64,
}

impl EvaluationResult {
    #[must_use]
    pub fn alert_messages(&self) -> Vec<&str> {
        self.alerts.iter().map(|a| a.message.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_cross_maps_to_golden_cross_kind() {
        assert_eq!(
            AlertKind::for_condition(&Condition::golden_cross(5, 10)),
            AlertKind::GoldenCross
        );
    }

    #[test]
    fn alert_kind_keys_are_unique() {
        let mut keys: Vec<_> = AlertKind::ALL.iter().map(|k| k.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), AlertKind::ALL.len());
    }
}
