//! Monitors and their lifecycle.
//!
//! ```text
//! pending --activate--> active --trigger--> triggered
//!                         ^                    |
//!                         +------ re-arm ------+
//!   any state --stop--> stopped (idempotent)
//! ```
//!
//! `triggered` is a flag state, not terminal: triggered monitors keep being
//! checked. Conditions are frozen from creation on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::condition::{CombineMode, Condition};
use super::error::DomainError;
use super::id::{MonitorId, OwnerId};

/// Rendering target of a generated script. Never affects evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptDialect {
    #[default]
    Python,
    #[serde(alias = "pine")]
    PineScript,
}

impl ScriptDialect {
    pub const ALL: [ScriptDialect; 2] = [ScriptDialect::Python, ScriptDialect::PineScript];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::PineScript => "pinescript",
        }
    }
}

impl fmt::Display for ScriptDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptDialect {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "pinescript" | "pine" => Ok(Self::PineScript),
            other => Err(DomainError::UnknownDialect(other.to_string())),
        }
    }
}

/// Lifecycle state of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Pending,
    Active,
    Triggered,
    Stopped,
}

impl MonitorStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Triggered => "triggered",
            Self::Stopped => "stopped",
        }
    }

    /// Whether `self -> to` is an allowed transition.
    #[must_use]
    pub const fn can_transition_to(self, to: MonitorStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Triggered)
                | (Self::Triggered, Self::Active)
                | (_, Self::Stopped)
        )
    }

    /// Active and triggered monitors are evaluated on checks and ticks.
    #[must_use]
    pub const fn is_checkable(self) -> bool {
        matches!(self, Self::Active | Self::Triggered)
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "triggered" => Ok(Self::Triggered),
            "stopped" => Ok(Self::Stopped),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Unpersisted output of script synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorDraft {
    pub stock_code: String,
    pub stock_name: String,
    /// Original free-text intent.
    pub intent: String,
    pub dialect: ScriptDialect,
    pub script_text: String,
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub combine: CombineMode,
}

impl MonitorDraft {
    /// Validate the draft before it becomes a monitor.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty stock code, no conditions, or a
    /// condition with out-of-range parameters.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.stock_code.trim().is_empty() {
            return Err(DomainError::EmptyStockCode);
        }
        if self.conditions.is_empty() {
            return Err(DomainError::EmptyConditions);
        }
        self.conditions.iter().try_for_each(Condition::validate)
    }
}

/// A persisted watcher binding a stock to a frozen set of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub(crate) id: MonitorId,
    pub(crate) owner: OwnerId,
    pub(crate) stock_code: String,
    pub(crate) stock_name: String,
    pub(crate) intent: String,
    pub(crate) status: MonitorStatus,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) combine: CombineMode,
    pub(crate) script_text: String,
    pub(crate) script_dialect: ScriptDialect,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_check_at: Option<DateTime<Utc>>,
    pub(crate) trigger_count: u64,
    pub(crate) last_triggered_at: Option<DateTime<Utc>>,
    /// Timestamp of the bar whose evaluation last triggered.
    pub(crate) last_trigger_bar_at: Option<DateTime<Utc>>,
    pub(crate) last_error: Option<String>,
}

impl Monitor {
    /// Create a `pending` monitor from a validated draft.
    ///
    /// # Errors
    ///
    /// Returns the draft's validation error.
    pub fn from_draft(
        draft: MonitorDraft,
        owner: OwnerId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id: MonitorId::new(),
            owner,
            stock_code: draft.stock_code,
            stock_name: draft.stock_name,
            intent: draft.intent,
            status: MonitorStatus::Pending,
            conditions: draft.conditions,
            combine: draft.combine,
            script_text: draft.script_text,
            script_dialect: draft.dialect,
            created_at: now,
            last_check_at: None,
            trigger_count: 0,
            last_triggered_at: None,
            last_trigger_bar_at: None,
            last_error: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> &MonitorId {
        &self.id
    }

    #[must_use]
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    #[must_use]
    pub fn stock_code(&self) -> &str {
        &self.stock_code
    }

    #[must_use]
    pub fn stock_name(&self) -> &str {
        &self.stock_name
    }

    #[must_use]
    pub fn intent(&self) -> &str {
        &self.intent
    }

    #[must_use]
    pub fn status(&self) -> MonitorStatus {
        self.status
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn combine(&self) -> CombineMode {
        self.combine
    }

    #[must_use]
    pub fn script_text(&self) -> &str {
        &self.script_text
    }

    #[must_use]
    pub fn script_dialect(&self) -> ScriptDialect {
        self.script_dialect
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_check_at(&self) -> Option<DateTime<Utc>> {
        self.last_check_at
    }

    #[must_use]
    pub fn trigger_count(&self) -> u64 {
        self.trigger_count
    }

    #[must_use]
    pub fn last_triggered_at(&self) -> Option<DateTime<Utc>> {
        self.last_triggered_at
    }

    #[must_use]
    pub fn last_trigger_bar_at(&self) -> Option<DateTime<Utc>> {
        self.last_trigger_bar_at
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Move to `to` if the transition table allows it.
    ///
    /// Returns the previous status. On rejection the monitor is unchanged and
    /// the attempted `(from, to)` pair is returned.
    pub fn transition(
        &mut self,
        to: MonitorStatus,
    ) -> Result<MonitorStatus, (MonitorStatus, MonitorStatus)> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err((from, to));
        }
        self.status = to;
        Ok(from)
    }

    /// Count a confirmed trigger and return the new count.
    pub(crate) fn increment_trigger(&mut self, at: DateTime<Utc>) -> u64 {
        self.trigger_count += 1;
        self.last_triggered_at = Some(at);
        self.trigger_count
    }

    pub(crate) fn record_check(&mut self, at: DateTime<Utc>, error: Option<String>) {
        self.last_check_at = Some(at);
        self.last_error = error;
    }
}
