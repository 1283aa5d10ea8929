//! Transport-agnostic control surface of the monitor engine.
//!
//! # Overview
//!
//! - [`MonitorControl`]: generate, activate, check and manage monitors
//! - [`GenerateRequest`]: input of the synthesis call
//! - [`CheckOutcome`]: evaluation result plus the bookkeeping it caused
//! - [`ConditionTemplate`]: a supported condition kind and how to ask for it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChannelKind, ChannelReport, Condition, DeliveryReport, EvaluationResult, IndicatorKind,
    Monitor, MonitorDraft, MonitorId, NotificationRecord, NotificationSettings, OhlcvSeries,
    OwnerId, ScriptDialect,
};
use crate::error::Result;

/// Input of [`MonitorControl::generate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub stock_code: String,
    pub stock_name: String,
    pub intent: String,
    /// Falls back to the configured default dialect.
    pub dialect: Option<ScriptDialect>,
}

/// Result of an explicit check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub monitor_id: MonitorId,
    pub result: EvaluationResult,
    /// Trigger count after this check.
    pub trigger_count: u64,
    /// True when this check counted a new trigger. False for a repeat of the
    /// bar that already triggered.
    pub counted: bool,
    /// Present when alerts were handed to the dispatcher.
    pub delivery: Option<DeliveryReport>,
}

/// A supported condition kind, listed for users composing intents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTemplate {
    pub indicator: IndicatorKind,
    pub name: String,
    pub description: String,
    /// Keywords that select this template.
    pub keywords: Vec<String>,
    /// Condition produced when the intent gives no parameters.
    pub example: Condition,
    pub example_intent: String,
}

/// Control surface consumed by the surrounding application.
#[async_trait]
pub trait MonitorControl: Send + Sync {
    /// Synthesize a draft without persisting it.
    async fn generate(&self, request: GenerateRequest) -> Result<MonitorDraft>;

    /// Persist a draft and transition it to `active`.
    async fn activate(&self, owner: &OwnerId, draft: MonitorDraft) -> Result<MonitorId>;

    /// Evaluate a monitor against a caller-supplied series now.
    async fn check(&self, id: &MonitorId, series: OhlcvSeries) -> Result<CheckOutcome>;

    /// Stop a monitor. Stopping a stopped monitor succeeds.
    async fn deactivate(&self, id: &MonitorId) -> Result<()>;

    /// Move a triggered monitor back to `active`.
    async fn rearm(&self, id: &MonitorId) -> Result<()>;

    /// Remove a monitor and its history entirely.
    async fn delete(&self, id: &MonitorId) -> Result<()>;

    async fn get_monitor(&self, id: &MonitorId) -> Result<Monitor>;

    async fn list_monitors(&self, owner: &OwnerId) -> Result<Vec<Monitor>>;

    /// Stored settings, or defaults.
    async fn notification_settings(&self, owner: &OwnerId) -> Result<NotificationSettings>;

    async fn set_notification_settings(
        &self,
        owner: &OwnerId,
        settings: NotificationSettings,
    ) -> Result<()>;

    /// Newest first, at most `limit` entries.
    fn notification_history(&self, owner: &OwnerId, limit: usize) -> Vec<NotificationRecord>;

    /// Returns the number of entries removed.
    fn clear_notification_history(&self, owner: &OwnerId) -> usize;

    /// Deliver a canned message over one channel, honouring enable flags and
    /// quiet hours.
    async fn send_test_notification(
        &self,
        owner: &OwnerId,
        channel: ChannelKind,
    ) -> Result<ChannelReport>;

    fn templates(&self) -> Vec<ConditionTemplate>;

    fn dialects(&self) -> Vec<ScriptDialect>;
}
