//! Evaluable trigger conditions.
//!
//! A [`Condition`] is one technical-indicator predicate. Conditions are
//! frozen once their monitor is activated; regenerating them means creating
//! a new monitor.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Indicator family a condition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorKind {
    MaCross,
    RsiThreshold,
    PriceBreakout,
    VolumeSpike,
    MacdCross,
    Custom,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 6] = [
        IndicatorKind::MaCross,
        IndicatorKind::RsiThreshold,
        IndicatorKind::PriceBreakout,
        IndicatorKind::VolumeSpike,
        IndicatorKind::MacdCross,
        IndicatorKind::Custom,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaCross => "MA_CROSS",
            Self::RsiThreshold => "RSI_THRESHOLD",
            Self::PriceBreakout => "PRICE_BREAKOUT",
            Self::VolumeSpike => "VOLUME_SPIKE",
            Self::MacdCross => "MACD_CROSS",
            Self::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a line cross: `Up` is a golden cross, `Down` a death cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossDirection {
    Up,
    Down,
}

impl CrossDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Inclusive threshold comparison.
///
/// `Above` means `>=` and `Below` means `<=`, both with a small relative
/// epsilon, so a value sitting exactly on the threshold triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Above,
    Below,
}

impl Comparator {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Above => ">=",
            Self::Below => "<=",
        }
    }
}

/// How the conditions of one monitor combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    /// Every condition must hold.
    #[default]
    All,
    /// Any single condition is enough.
    Any,
}

impl CombineMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
        }
    }
}

/// One evaluable technical-indicator predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "indicator", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    /// Fast SMA crosses the slow SMA between the last two bars.
    MaCross {
        fast: usize,
        slow: usize,
        direction: CrossDirection,
    },
    /// Wilder RSI at the latest bar compared against a threshold.
    RsiThreshold {
        period: usize,
        comparator: Comparator,
        value: f64,
    },
    /// Latest close breaks the highest high (`Above`) or lowest low
    /// (`Below`) of the preceding `lookback` bars.
    PriceBreakout {
        lookback: usize,
        comparator: Comparator,
    },
    /// Latest volume is at least `multiplier` times the trailing average of
    /// the preceding `lookback` bars.
    VolumeSpike { lookback: usize, multiplier: f64 },
    /// MACD line (DIF) crosses its signal line (DEA) between the last two bars.
    MacdCross {
        fast: usize,
        slow: usize,
        signal: usize,
        direction: CrossDirection,
    },
    /// Latest close compared against a fixed price level.
    Custom {
        label: String,
        comparator: Comparator,
        value: f64,
    },
}

impl Condition {
    /// Golden cross of the classic MA5/MA10 pair.
    #[must_use]
    pub fn golden_cross(fast: usize, slow: usize) -> Self {
        Self::MaCross {
            fast,
            slow,
            direction: CrossDirection::Up,
        }
    }

    #[must_use]
    pub fn kind(&self) -> IndicatorKind {
        match self {
            Self::MaCross { .. } => IndicatorKind::MaCross,
            Self::RsiThreshold { .. } => IndicatorKind::RsiThreshold,
            Self::PriceBreakout { .. } => IndicatorKind::PriceBreakout,
            Self::VolumeSpike { .. } => IndicatorKind::VolumeSpike,
            Self::MacdCross { .. } => IndicatorKind::MacdCross,
            Self::Custom { .. } => IndicatorKind::Custom,
        }
    }

    /// Optional lookback window in bars.
    #[must_use]
    pub fn lookback(&self) -> Option<usize> {
        match self {
            Self::MaCross { slow, .. } => Some(*slow),
            Self::RsiThreshold { period, .. } => Some(*period),
            Self::PriceBreakout { lookback, .. } | Self::VolumeSpike { lookback, .. } => {
                Some(*lookback)
            }
            Self::MacdCross { slow, signal, .. } => Some(slow + signal),
            Self::Custom { .. } => None,
        }
    }

    /// Minimum number of bars needed to evaluate this condition.
    #[must_use]
    pub fn required_bars(&self) -> usize {
        match self {
            Self::MaCross { slow, .. } => slow + 1,
            Self::RsiThreshold { period, .. } => period + 1,
            Self::PriceBreakout { lookback, .. } | Self::VolumeSpike { lookback, .. } => {
                lookback + 1
            }
            Self::MacdCross { slow, signal, .. } => slow + signal,
            Self::Custom { .. } => 1,
        }
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidParameter`] naming the offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        let invalid = |name: &'static str, reason: &str| DomainError::InvalidParameter {
            condition: self.to_string(),
            name,
            reason: reason.to_string(),
        };

        match self {
            Self::MaCross { fast, slow, .. } => {
                if *fast == 0 {
                    return Err(invalid("fast", "must be at least 1"));
                }
                if fast >= slow {
                    return Err(invalid("slow", "must be greater than fast"));
                }
            }
            Self::RsiThreshold { period, value, .. } => {
                if *period == 0 {
                    return Err(invalid("period", "must be at least 1"));
                }
                if !value.is_finite() || !(0.0..=100.0).contains(value) {
                    return Err(invalid("value", "must be between 0 and 100"));
                }
            }
            Self::PriceBreakout { lookback, .. } => {
                if *lookback == 0 {
                    return Err(invalid("lookback", "must be at least 1"));
                }
            }
            Self::VolumeSpike {
                lookback,
                multiplier,
            } => {
                if *lookback == 0 {
                    return Err(invalid("lookback", "must be at least 1"));
                }
                if !multiplier.is_finite() || *multiplier <= 0.0 {
                    return Err(invalid("multiplier", "must be greater than 0"));
                }
            }
            Self::MacdCross {
                fast, slow, signal, ..
            } => {
                if *fast == 0 || *signal == 0 {
                    return Err(invalid("fast", "periods must be at least 1"));
                }
                if fast >= slow {
                    return Err(invalid("slow", "must be greater than fast"));
                }
            }
            Self::Custom { value, .. } => {
                if !value.is_finite() || *value <= 0.0 {
                    return Err(invalid("value", "must be a positive price"));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaCross {
                fast,
                slow,
                direction,
            } => write!(f, "MA_CROSS({fast},{slow},{})", direction.as_str()),
            Self::RsiThreshold {
                period,
                comparator,
                value,
            } => write!(f, "RSI_THRESHOLD({period},{},{value})", comparator.symbol()),
            Self::PriceBreakout {
                lookback,
                comparator,
            } => write!(f, "PRICE_BREAKOUT({lookback},{})", comparator.symbol()),
            Self::VolumeSpike {
                lookback,
                multiplier,
            } => write!(f, "VOLUME_SPIKE({lookback},{multiplier}x)"),
            Self::MacdCross {
                fast,
                slow,
                signal,
                direction,
            } => write!(f, "MACD_CROSS({fast},{slow},{signal},{})", direction.as_str()),
            Self::Custom {
                label,
                comparator,
                value,
            } => write!(f, "CUSTOM({label},{},{value})", comparator.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_describes_ma_cross() {
        assert_eq!(Condition::golden_cross(5, 10).to_string(), "MA_CROSS(5,10,up)");
    }

    #[test]
    fn ma_cross_requires_fast_below_slow() {
        let cond = Condition::MaCross {
            fast: 10,
            slow: 5,
            direction: CrossDirection::Up,
        };
        assert!(matches!(
            cond.validate(),
            Err(DomainError::InvalidParameter { name: "slow", .. })
        ));
    }

    #[test]
    fn rsi_threshold_must_be_a_percentage() {
        let cond = Condition::RsiThreshold {
            period: 14,
            comparator: Comparator::Above,
            value: 120.0,
        };
        assert!(cond.validate().is_err());
    }

    #[test]
    fn required_bars_cover_previous_bar_for_crosses() {
        assert_eq!(Condition::golden_cross(5, 10).required_bars(), 11);
        let macd = Condition::MacdCross {
            fast: 12,
            slow: 26,
            signal: 9,
            direction: CrossDirection::Up,
        };
        assert_eq!(macd.required_bars(), 35);
    }

    #[test]
    fn serializes_with_indicator_tag() {
        let json = serde_json::to_value(Condition::golden_cross(5, 10)).unwrap();
        assert_eq!(json["indicator"], "MA_CROSS");
        assert_eq!(json["direction"], "up");

        let parsed: Condition = serde_json::from_str(
            r#"{"indicator":"RSI_THRESHOLD","period":14,"comparator":"above","value":70.0}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind(), IndicatorKind::RsiThreshold);
    }
}
