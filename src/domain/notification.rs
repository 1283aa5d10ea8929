//! Notification settings, formatted messages and delivery reports.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::evaluation::{Alert, AlertKind};
use super::id::{MonitorId, OwnerId};

const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// `HH:MM` (de)serialization for optional times of day.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_some(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => super::parse_time_of_day(text)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Parse a local time of day written as `HH:MM` or `HH:MM:SS`.
///
/// # Errors
///
/// Returns [`DomainError::InvalidTimeOfDay`] for anything else.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .map_err(|_| DomainError::InvalidTimeOfDay(text.to_string()))
}

/// Half-open local time window `[start, end)`, wrapping past midnight when
/// `start > end`. Equal bounds mean an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, local: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= local && local < self.end
        } else {
            local >= self.start || local < self.end
        }
    }
}

/// Per-owner notification preferences. Read by the dispatcher, never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub browser_enabled: bool,
    pub email_enabled: bool,
    pub email_address: Option<String>,
    #[serde(with = "hhmm")]
    pub quiet_hours_start: Option<NaiveTime>,
    #[serde(with = "hhmm")]
    pub quiet_hours_end: Option<NaiveTime>,
    /// Alert kind key to enabled flag. Missing keys are enabled.
    pub notification_types: BTreeMap<String, bool>,
    /// Owner's local clock relative to UTC, used for quiet hours.
    pub utc_offset_minutes: i32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            browser_enabled: true,
            email_enabled: false,
            email_address: None,
            quiet_hours_start: None,
            quiet_hours_end: None,
            notification_types: AlertKind::ALL
                .iter()
                .map(|kind| (kind.key().to_string(), true))
                .collect(),
            utc_offset_minutes: 0,
        }
    }
}

impl NotificationSettings {
    /// Quiet-hours window, present only when both bounds are set.
    #[must_use]
    pub fn quiet_hours(&self) -> Option<QuietHours> {
        match (self.quiet_hours_start, self.quiet_hours_end) {
            (Some(start), Some(end)) => Some(QuietHours::new(start, end)),
            _ => None,
        }
    }

    #[must_use]
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveTime {
        (now + Duration::minutes(i64::from(self.utc_offset_minutes))).time()
    }

    #[must_use]
    pub fn in_quiet_hours(&self, now: DateTime<Utc>) -> bool {
        self.quiet_hours()
            .is_some_and(|window| window.contains(self.local_time(now)))
    }

    #[must_use]
    pub fn is_kind_enabled(&self, kind: AlertKind) -> bool {
        self.notification_types
            .get(kind.key())
            .copied()
            .unwrap_or(true)
    }

    #[must_use]
    pub fn is_channel_enabled(&self, channel: ChannelKind) -> bool {
        match channel {
            ChannelKind::Browser => self.browser_enabled,
            ChannelKind::Email => self.email_enabled,
        }
    }

    /// Usable email address, if any.
    #[must_use]
    pub fn email_address(&self) -> Option<&str> {
        self.email_address
            .as_deref()
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
    }

    /// # Errors
    ///
    /// Returns an error when the UTC offset is out of range.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(DomainError::InvalidUtcOffset(self.utc_offset_minutes));
        }
        Ok(())
    }
}

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Browser,
    Email,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 2] = [ChannelKind::Browser, ChannelKind::Email];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Email => "email",
        }
    }

    /// Browser notifications are acknowledged on the owner's own device and
    /// are never silenced by quiet hours.
    #[must_use]
    pub const fn respects_quiet_hours(self) -> bool {
        !matches!(self, Self::Browser)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "email" => Ok(Self::Email),
            other => Err(DomainError::UnknownChannel(other.to_string())),
        }
    }
}

/// Why a channel was not delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DeliveryReason {
    /// Owner turned the channel off.
    ChannelDisabled,
    /// Email is enabled but no address is configured.
    NoEmailAddress,
    /// Suppressed by quiet hours.
    QuietHours,
    /// Every alert kind in the event is disabled.
    AlertKindsDisabled,
    /// Transport reported an error.
    Failed(String),
    /// Transport did not answer in time.
    TimedOut,
}

impl DeliveryReason {
    /// Policy suppression, as opposed to a failure or a disabled channel.
    #[must_use]
    pub fn is_suppression(&self) -> bool {
        matches!(self, Self::QuietHours | Self::AlertKindsDisabled)
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::NoEmailAddress | Self::Failed(_) | Self::TimedOut)
    }
}

impl fmt::Display for DeliveryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelDisabled => f.write_str("channel disabled"),
            Self::NoEmailAddress => f.write_str("no email address"),
            Self::QuietHours => f.write_str("quiet hours"),
            Self::AlertKindsDisabled => f.write_str("alert kinds disabled"),
            Self::Failed(detail) => write!(f, "failed: {detail}"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Outcome for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel: ChannelKind,
    pub attempted: bool,
    pub delivered: bool,
    pub reason: Option<DeliveryReason>,
}

impl ChannelReport {
    #[must_use]
    pub fn delivered(channel: ChannelKind) -> Self {
        Self {
            channel,
            attempted: true,
            delivered: true,
            reason: None,
        }
    }

    /// Attempted but not delivered.
    #[must_use]
    pub fn failed(channel: ChannelKind, reason: DeliveryReason) -> Self {
        Self {
            channel,
            attempted: true,
            delivered: false,
            reason: Some(reason),
        }
    }

    /// Not attempted at all.
    #[must_use]
    pub fn skipped(channel: ChannelKind, reason: DeliveryReason) -> Self {
        Self {
            channel,
            attempted: false,
            delivered: false,
            reason: Some(reason),
        }
    }

    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.reason.as_ref().is_some_and(DeliveryReason::is_suppression)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.reason.as_ref().is_some_and(DeliveryReason::is_failure)
    }
}

/// Per-channel delivery outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub monitor_id: Option<MonitorId>,
    pub owner: OwnerId,
    pub channels: Vec<ChannelReport>,
    pub dispatched_at: DateTime<Utc>,
}

impl DeliveryReport {
    #[must_use]
    pub fn channel(&self, kind: ChannelKind) -> Option<&ChannelReport> {
        self.channels.iter().find(|c| c.channel == kind)
    }

    #[must_use]
    pub fn any_delivered(&self) -> bool {
        self.channels.iter().any(|c| c.delivered)
    }
}

/// A formatted notification ready for a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub monitor_id: Option<MonitorId>,
    pub stock_code: String,
    pub stock_name: String,
    /// Short title (browser).
    pub title: String,
    /// Short body (browser).
    pub body: String,
    pub email_subject: String,
    pub email_text: String,
    pub email_html: String,
    pub alerts: Vec<Alert>,
    pub latest_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// One entry of an owner's notification history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub owner: OwnerId,
    pub message: NotificationMessage,
    pub report: DeliveryReport,
}
