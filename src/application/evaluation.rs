//! Condition evaluation against one OHLCV snapshot.
//!
//! Evaluation is a pure function of `(conditions, combine, series)`: the
//! result carries the last bar's timestamp, not the wall clock, so running
//! the same inputs twice yields identical results.

use chrono::Duration;

use crate::domain::indicator::{
    approx_ge, approx_le, crossed_down, crossed_up, macd, rsi, sma, window_max, window_mean,
    window_min,
};
use crate::domain::{
    Alert, AlertKind, CombineMode, Comparator, Condition, CrossDirection, EvaluationResult,
    OhlcvSeries, Severity,
};
use crate::error::EvaluationError;

/// Evaluates condition sets. Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    tolerance: Duration,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Duration::zero())
    }
}

impl Evaluator {
    /// `tolerance` is how far a timestamp may step backwards before the
    /// series is rejected.
    #[must_use]
    pub fn new(tolerance: Duration) -> Self {
        Self { tolerance }
    }

    /// Evaluate every condition on the latest bar of `series`.
    ///
    /// With [`CombineMode::All`] the result triggers only when every
    /// condition holds; with [`CombineMode::Any`] one is enough. Alerts are
    /// returned only for a triggered result, one per satisfied condition.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] for a malformed series or when the
    /// series is too short for a condition's lookback. Under
    /// [`CombineMode::Any`] a short series is only an error when no
    /// condition can be evaluated at all.
    pub fn evaluate(
        &self,
        conditions: &[Condition],
        combine: CombineMode,
        series: &OhlcvSeries,
    ) -> Result<EvaluationResult, EvaluationError> {
        series.validate(self.tolerance)?;
        let last = series.last().ok_or(EvaluationError::EmptySeries)?;

        let short = |condition: &Condition| {
            let required = condition.required_bars();
            (series.len() < required).then(|| EvaluationError::InsufficientData {
                condition: condition.to_string(),
                required,
                available: series.len(),
            })
        };

        let fired: Vec<Option<Alert>> = match combine {
            CombineMode::All => {
                if let Some(err) = conditions.iter().find_map(short) {
                    return Err(err);
                }
                conditions
                    .iter()
                    .map(|condition| evaluate_condition(condition, series))
                    .collect()
            }
            // A condition without enough history is simply not satisfied,
            // as long as at least one other can be evaluated.
            CombineMode::Any => {
                let mut first_short = None;
                let fired: Vec<Option<Alert>> = conditions
                    .iter()
                    .filter_map(|condition| match short(condition) {
                        Some(err) => {
                            first_short.get_or_insert(err);
                            None
                        }
                        None => Some(evaluate_condition(condition, series)),
                    })
                    .collect();
                match first_short {
                    Some(err) if fired.is_empty() => return Err(err),
                    _ => fired,
                }
            }
        };

        let triggered = !fired.is_empty()
            && match combine {
                CombineMode::All => fired.iter().all(Option::is_some),
                CombineMode::Any => fired.iter().any(Option::is_some),
            };

        let alerts = if triggered {
            fired.into_iter().flatten().collect()
        } else {
            Vec::new()
        };

        Ok(EvaluationResult {
            triggered,
            alerts,
            evaluated_at: last.ts,
            latest_price: last.close,
        })
    }
}

fn alert(condition: &Condition, severity: Severity, message: String) -> Alert {
    Alert {
        indicator: condition.kind(),
        kind: AlertKind::for_condition(condition),
        severity,
        condition: condition.to_string(),
        message,
    }
}

/// Evaluate one condition on the last bar. Callers guarantee enough bars.
fn evaluate_condition(condition: &Condition, series: &OhlcvSeries) -> Option<Alert> {
    let closes = series.closes();
    let n = closes.len();
    let close = closes[n - 1];

    match condition {
        Condition::MaCross {
            fast,
            slow,
            direction,
        } => {
            if n < 2 {
                return None;
            }
            let fast_ma = sma(&closes, *fast);
            let slow_ma = sma(&closes, *slow);
            let (pf, ps, cf, cs) = (fast_ma[n - 2], slow_ma[n - 2], fast_ma[n - 1], slow_ma[n - 1]);
            let message = match direction {
                CrossDirection::Up if crossed_up(pf, ps, cf, cs) => {
                    format!("MA{fast}上穿MA{slow}，形成金叉")
                }
                CrossDirection::Down if crossed_down(pf, ps, cf, cs) => {
                    format!("MA{fast}下穿MA{slow}，形成死叉")
                }
                _ => return None,
            };
            Some(alert(condition, Severity::Warning, message))
        }
        Condition::RsiThreshold {
            period,
            comparator,
            value,
        } => {
            let current = rsi(&closes, *period)[n - 1];
            if current.is_nan() {
                return None;
            }
            let message = match comparator {
                Comparator::Above if approx_ge(current, *value) => {
                    format!("RSI({period})={current:.2}，超买(≥{value})")
                }
                Comparator::Below if approx_le(current, *value) => {
                    format!("RSI({period})={current:.2}，超卖(≤{value})")
                }
                _ => return None,
            };
            Some(alert(condition, Severity::Info, message))
        }
        Condition::PriceBreakout {
            lookback,
            comparator,
        } => {
            let message = match comparator {
                Comparator::Above => {
                    let highest = window_max(&series.highs(), n - 1, *lookback)?;
                    if !approx_ge(close, highest) {
                        return None;
                    }
                    format!("收盘价{close:.2}突破{lookback}日最高价{highest:.2}")
                }
                Comparator::Below => {
                    let lowest = window_min(&series.lows(), n - 1, *lookback)?;
                    if !approx_le(close, lowest) {
                        return None;
                    }
                    format!("收盘价{close:.2}跌破{lookback}日最低价{lowest:.2}")
                }
            };
            Some(alert(condition, Severity::Critical, message))
        }
        Condition::VolumeSpike {
            lookback,
            multiplier,
        } => {
            let volumes = series.volumes();
            let average = window_mean(&volumes, n - 1, *lookback)?;
            let volume = volumes[n - 1];
            if average <= 0.0 || !approx_ge(volume, average * multiplier) {
                return None;
            }
            let ratio = volume / average;
            Some(alert(
                condition,
                Severity::Info,
                format!("成交量放大至{lookback}日均量的{ratio:.2}倍"),
            ))
        }
        Condition::MacdCross {
            fast,
            slow,
            signal,
            direction,
        } => {
            if n < 2 {
                return None;
            }
            let (dif, dea) = macd(&closes, *fast, *slow, *signal);
            let (pd, pe, cd, ce) = (dif[n - 2], dea[n - 2], dif[n - 1], dea[n - 1]);
            let message = match direction {
                CrossDirection::Up if crossed_up(pd, pe, cd, ce) => {
                    format!("MACD金叉：DIF({cd:.3})上穿DEA({ce:.3})")
                }
                CrossDirection::Down if crossed_down(pd, pe, cd, ce) => {
                    format!("MACD死叉：DIF({cd:.3})下穿DEA({ce:.3})")
                }
                _ => return None,
            };
            Some(alert(condition, Severity::Warning, message))
        }
        Condition::Custom {
            label,
            comparator,
            value,
        } => {
            let message = match comparator {
                Comparator::Above if approx_ge(close, *value) => {
                    format!("{label}：收盘价{close:.2}≥{value}")
                }
                Comparator::Below if approx_le(close, *value) => {
                    format!("{label}：收盘价{close:.2}≤{value}")
                }
                _ => return None,
            };
            Some(alert(condition, Severity::Warning, message))
        }
    }
}
