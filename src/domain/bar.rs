//! OHLCV bars and series validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::DomainError;
use crate::error::EvaluationError;

/// Bar interval requested from a data source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarPeriod {
    #[serde(rename = "5min")]
    Minute5,
    #[serde(rename = "15min")]
    Minute15,
    #[serde(rename = "30min")]
    Minute30,
    #[serde(rename = "60min")]
    Minute60,
    #[default]
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
}

impl BarPeriod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute5 => "5min",
            Self::Minute15 => "15min",
            Self::Minute30 => "30min",
            Self::Minute60 => "60min",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for BarPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarPeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5min" => Ok(Self::Minute5),
            "15min" => Ok(Self::Minute15),
            "30min" => Ok(Self::Minute30),
            "60min" | "hourly" => Ok(Self::Minute60),
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(DomainError::UnknownPeriod(other.to_string())),
        }
    }
}

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time.
    #[serde(
        rename = "timestamp",
        alias = "trade_date",
        alias = "date",
        alias = "time",
        deserialize_with = "deserialize_timestamp"
    )]
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(alias = "vol")]
    pub volume: f64,
}

impl Bar {
    pub fn new(ts: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYYMMDD` or epoch seconds.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Epoch(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Epoch(secs) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid epoch seconds: {secs}"))),
        Raw::Text(text) => parse_timestamp(&text).map_err(serde::de::Error::custom),
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts.and_utc());
    }
    for format in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            if let Some(ts) = date.and_hms_opt(0, 0, 0) {
                return Ok(ts.and_utc());
            }
        }
    }
    Err(format!("unrecognised timestamp: {text}"))
}

/// Ascending OHLCV series handed to the evaluator by value.
///
/// Gaps and duplicate timestamps are used as given. Only timestamps moving
/// backwards by more than the configured tolerance are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OhlcvSeries {
    bars: Vec<Bar>,
}

impl OhlcvSeries {
    #[must_use]
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Check the series is usable for evaluation.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] for an empty series, a non-finite or
    /// negative value, or a timestamp that moves backwards by more than
    /// `tolerance`.
    pub fn validate(&self, tolerance: chrono::Duration) -> Result<(), EvaluationError> {
        if self.bars.is_empty() {
            return Err(EvaluationError::EmptySeries);
        }

        for (index, bar) in self.bars.iter().enumerate() {
            let fields = [
                ("open", bar.open),
                ("high", bar.high),
                ("low", bar.low),
                ("close", bar.close),
                ("volume", bar.volume),
            ];
            for (field, value) in fields {
                if !value.is_finite() || value < 0.0 {
                    return Err(EvaluationError::InvalidBar { index, field });
                }
            }

            if index > 0 {
                let previous = self.bars[index - 1].ts;
                if bar.ts < previous && previous - bar.ts > tolerance {
                    return Err(EvaluationError::NonMonotonic {
                        index,
                        previous,
                        current: bar.ts,
                    });
                }
            }
        }

        Ok(())
    }
}

impl From<Vec<Bar>> for OhlcvSeries {
    fn from(bars: Vec<Bar>) -> Self {
        Self::new(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bar_at(day: i64, close: f64) -> Bar {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day);
        Bar::new(ts, close, close, close, close, 1000.0)
    }

    #[test]
    fn empty_series_is_rejected() {
        let series = OhlcvSeries::default();
        assert_eq!(
            series.validate(Duration::zero()),
            Err(EvaluationError::EmptySeries)
        );
    }

    #[test]
    fn duplicate_timestamps_are_tolerated() {
        let series = OhlcvSeries::new(vec![bar_at(0, 1.0), bar_at(0, 1.1), bar_at(1, 1.2)]);
        assert!(series.validate(Duration::zero()).is_ok());
    }

    #[test]
    fn backwards_timestamp_beyond_tolerance_is_rejected() {
        let series = OhlcvSeries::new(vec![bar_at(2, 1.0), bar_at(0, 1.1)]);
        let err = series.validate(Duration::hours(1)).unwrap_err();
        assert!(matches!(err, EvaluationError::NonMonotonic { index: 1, .. }));
    }

    #[test]
    fn backwards_timestamp_within_tolerance_is_accepted() {
        let series = OhlcvSeries::new(vec![bar_at(1, 1.0), bar_at(0, 1.1)]);
        assert!(series.validate(Duration::days(2)).is_ok());
    }

    #[test]
    fn non_finite_value_is_rejected() {
        let mut bar = bar_at(0, 1.0);
        bar.close = f64::NAN;
        let series = OhlcvSeries::new(vec![bar]);
        assert_eq!(
            series.validate(Duration::zero()),
            Err(EvaluationError::InvalidBar {
                index: 0,
                field: "close"
            })
        );
    }

    #[test]
    fn period_parses_aliases() {
        assert_eq!("day".parse::<BarPeriod>().unwrap(), BarPeriod::Daily);
        assert_eq!("60min".parse::<BarPeriod>().unwrap(), BarPeriod::Minute60);
        assert!("fortnightly".parse::<BarPeriod>().is_err());
    }

    #[test]
    fn deserializes_date_only_and_epoch_timestamps() {
        let json = r#"[
            {"date": "2024-03-01", "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 100},
            {"timestamp": 1709337600, "open": 1, "high": 2, "low": 0.5, "close": 1.6, "vol": 120}
        ]"#;
        let series: OhlcvSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.bars()[0].ts,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(series.bars()[1].volume, 120.0);
    }
}
