//! Notification dispatcher.
//!
//! Formats the alerts it is handed and attempts every channel independently
//! under the owner's settings. Whether to notify at all is decided before
//! dispatch by the trigger bookkeeping; the dispatcher never deduplicates.
//!
//! Per channel, in order:
//!
//! 1. no enabled alert kind left: `AlertKindsDisabled`, not attempted
//! 2. channel off: `ChannelDisabled`, not attempted
//! 3. quiet hours, non-browser channels only: `QuietHours`, not attempted
//! 4. email without an address: `NoEmailAddress`, not attempted
//! 5. otherwise attempted with a timeout; failures land in the report

pub mod format;
pub mod history;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::{
    ChannelKind, ChannelReport, DeliveryReason, DeliveryReport, EvaluationResult, Monitor,
    NotificationMessage, NotificationRecord, NotificationSettings, OwnerId,
};
use crate::port::outbound::notifier::ChannelRegistry;

pub use history::NotificationHistory;

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound for one channel's delivery attempt.
    pub delivery_timeout: Duration,
    /// Records kept per owner.
    pub history_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(10),
            history_limit: 200,
        }
    }
}

/// Fans an evaluation result out to the owner's enabled channels.
pub struct Dispatcher {
    channels: ChannelRegistry,
    history: NotificationHistory,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher over `channels` with an empty history.
    pub fn new(channels: ChannelRegistry, config: DispatchConfig) -> Self {
        Self {
            history: NotificationHistory::new(config.history_limit),
            channels,
            config,
        }
    }

    #[must_use]
    pub fn history(&self) -> &NotificationHistory {
        &self.history
    }

    #[must_use]
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Deliver the alerts of a triggered check.
    pub async fn dispatch(
        &self,
        owner: &OwnerId,
        monitor: &Monitor,
        result: &EvaluationResult,
        settings: &NotificationSettings,
    ) -> DeliveryReport {
        self.dispatch_at(owner, monitor, result, settings, Utc::now())
            .await
    }

    /// [`Dispatcher::dispatch`] with an explicit clock for quiet hours.
    pub async fn dispatch_at(
        &self,
        owner: &OwnerId,
        monitor: &Monitor,
        result: &EvaluationResult,
        settings: &NotificationSettings,
        now: DateTime<Utc>,
    ) -> DeliveryReport {
        let alerts: Vec<_> = result
            .alerts
            .iter()
            .filter(|a| settings.is_kind_enabled(a.kind))
            .cloned()
            .collect();

        if alerts.is_empty() {
            debug!(monitor_id = %monitor.id(), owner = %owner, "All alert kinds disabled");
            return DeliveryReport {
                monitor_id: Some(monitor.id().clone()),
                owner: owner.clone(),
                channels: ChannelKind::ALL
                    .iter()
                    .map(|kind| ChannelReport::skipped(*kind, DeliveryReason::AlertKindsDisabled))
                    .collect(),
                dispatched_at: now,
            };
        }

        let message = format::alert_message(monitor, &alerts, result, now, settings.utc_offset_minutes);
        let channels = self
            .deliver_all(owner, &message, settings, &ChannelKind::ALL, now)
            .await;
        let report = DeliveryReport {
            monitor_id: Some(monitor.id().clone()),
            owner: owner.clone(),
            channels,
            dispatched_at: now,
        };

        info!(
            monitor_id = %monitor.id(),
            owner = %owner,
            stock_code = %monitor.stock_code(),
            alerts = alerts.len(),
            delivered = report.channels.iter().filter(|c| c.delivered).count(),
            "Alerts dispatched"
        );
        self.remember(owner, message, &report);
        report
    }

    /// Deliver a canned message over one channel.
    pub async fn send_test(
        &self,
        owner: &OwnerId,
        channel: ChannelKind,
        settings: &NotificationSettings,
        now: DateTime<Utc>,
    ) -> ChannelReport {
        let message = format::test_message(now, settings.utc_offset_minutes);
        let mut reports = self
            .deliver_all(owner, &message, settings, &[channel], now)
            .await;
        let report = reports
            .pop()
            .unwrap_or_else(|| ChannelReport::skipped(channel, DeliveryReason::ChannelDisabled));
        self.remember(
            owner,
            message,
            &DeliveryReport {
                monitor_id: None,
                owner: owner.clone(),
                channels: vec![report.clone()],
                dispatched_at: now,
            },
        );
        report
    }

    fn remember(&self, owner: &OwnerId, message: NotificationMessage, report: &DeliveryReport) {
        if report.channels.iter().any(|c| c.attempted) {
            self.history.push(NotificationRecord {
                owner: owner.clone(),
                message,
                report: report.clone(),
            });
        }
    }

    /// Gate and attempt each channel concurrently, reporting in input order.
    async fn deliver_all(
        &self,
        owner: &OwnerId,
        message: &NotificationMessage,
        settings: &NotificationSettings,
        kinds: &[ChannelKind],
        now: DateTime<Utc>,
    ) -> Vec<ChannelReport> {
        let quiet = settings.in_quiet_hours(now);
        let attempts = kinds.iter().map(|&kind| async move {
            if !settings.is_channel_enabled(kind) {
                return ChannelReport::skipped(kind, DeliveryReason::ChannelDisabled);
            }
            if quiet && kind.respects_quiet_hours() {
                debug!(owner = %owner, channel = %kind, "Suppressed by quiet hours");
                return ChannelReport::skipped(kind, DeliveryReason::QuietHours);
            }
            if kind == ChannelKind::Email && settings.email_address().is_none() {
                return ChannelReport::skipped(kind, DeliveryReason::NoEmailAddress);
            }
            let Some(channel) = self.channels.get(kind) else {
                return ChannelReport::skipped(
                    kind,
                    DeliveryReason::Failed("channel not registered".into()),
                );
            };

            match tokio::time::timeout(
                self.config.delivery_timeout,
                channel.deliver(owner, message, settings),
            )
            .await
            {
                Ok(Ok(())) => ChannelReport::delivered(kind),
                Ok(Err(e)) => {
                    warn!(owner = %owner, channel = %kind, error = %e, "Delivery failed");
                    ChannelReport::failed(kind, DeliveryReason::Failed(e.to_string()))
                }
                Err(_) => {
                    warn!(owner = %owner, channel = %kind, "Delivery timed out");
                    ChannelReport::failed(kind, DeliveryReason::TimedOut)
                }
            }
        });
        join_all(attempts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{NaiveTime, TimeZone};

    use crate::domain::{Alert, AlertKind, IndicatorKind, Severity};
    use crate::testkit::domain::monitor;
    use crate::testkit::stub::{FailingChannel, RecordingChannel, SlowChannel};

    fn result(kinds: &[AlertKind]) -> EvaluationResult {
        EvaluationResult {
            triggered: true,
            alerts: kinds
                .iter()
                .map(|kind| Alert {
                    indicator: IndicatorKind::MaCross,
                    kind: *kind,
                    severity: Severity::Warning,
                    condition: "MA_CROSS(5,10,up)".into(),
                    message: format!("{kind} fired"),
                })
                .collect(),
            evaluated_at: Utc::now(),
            latest_price: 10.0,
        }
    }

    fn email_settings() -> NotificationSettings {
        NotificationSettings {
            email_enabled: true,
            email_address: Some("me@example.com".into()),
            ..NotificationSettings::default()
        }
    }

    fn dispatcher(
        browser: Arc<RecordingChannel>,
        email: Arc<dyn crate::port::outbound::notifier::NotificationChannel>,
    ) -> Dispatcher {
        let mut channels = ChannelRegistry::new();
        channels.register(browser);
        channels.register(email);
        Dispatcher::new(
            channels,
            DispatchConfig {
                delivery_timeout: Duration::from_millis(50),
                history_limit: 10,
            },
        )
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn delivers_to_every_enabled_channel() {
        let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
        let email = Arc::new(RecordingChannel::new(ChannelKind::Email));
        let d = dispatcher(browser.clone(), email.clone());
        let owner = OwnerId::from("u");

        let report = d
            .dispatch_at(&owner, &monitor("600519"), &result(&[AlertKind::GoldenCross]), &email_settings(), noon())
            .await;

        assert!(report.channel(ChannelKind::Browser).unwrap().delivered);
        assert!(report.channel(ChannelKind::Email).unwrap().delivered);
        assert_eq!(browser.count(), 1);
        assert_eq!(email.count(), 1);
        assert_eq!(d.history().len(&owner), 1);
    }

    #[tokio::test]
    async fn quiet_hours_suppress_email_but_not_browser() {
        let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
        let email = Arc::new(RecordingChannel::new(ChannelKind::Email));
        let d = dispatcher(browser.clone(), email.clone());
        let settings = NotificationSettings {
            quiet_hours_start: NaiveTime::from_hms_opt(11, 0, 0),
            quiet_hours_end: NaiveTime::from_hms_opt(13, 0, 0),
            ..email_settings()
        };

        let report = d
            .dispatch_at(&OwnerId::from("u"), &monitor("600519"), &result(&[AlertKind::GoldenCross]), &settings, noon())
            .await;

        let browser_report = report.channel(ChannelKind::Browser).unwrap();
        let email_report = report.channel(ChannelKind::Email).unwrap();
        assert!(browser_report.delivered);
        assert!(!email_report.attempted);
        assert!(email_report.is_suppressed());
        assert!(!email_report.is_failed());
        assert_eq!(email.count(), 0);
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_others() {
        let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
        let d = dispatcher(browser.clone(), Arc::new(FailingChannel::new(ChannelKind::Email)));

        let report = d
            .dispatch_at(&OwnerId::from("u"), &monitor("600519"), &result(&[AlertKind::GoldenCross]), &email_settings(), noon())
            .await;

        assert!(report.channel(ChannelKind::Browser).unwrap().delivered);
        let email = report.channel(ChannelKind::Email).unwrap();
        assert!(email.attempted && !email.delivered);
        assert!(email.is_failed());
    }

    #[tokio::test]
    async fn slow_channel_times_out() {
        let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
        let d = dispatcher(
            browser,
            Arc::new(SlowChannel::new(ChannelKind::Email, Duration::from_secs(5))),
        );

        let report = d
            .dispatch_at(&OwnerId::from("u"), &monitor("600519"), &result(&[AlertKind::GoldenCross]), &email_settings(), noon())
            .await;

        assert_eq!(
            report.channel(ChannelKind::Email).unwrap().reason,
            Some(DeliveryReason::TimedOut)
        );
    }

    #[tokio::test]
    async fn email_without_address_is_reported() {
        let email = Arc::new(RecordingChannel::new(ChannelKind::Email));
        let d = dispatcher(Arc::new(RecordingChannel::new(ChannelKind::Browser)), email.clone());
        let settings = NotificationSettings {
            email_enabled: true,
            ..NotificationSettings::default()
        };

        let report = d
            .dispatch_at(&OwnerId::from("u"), &monitor("600519"), &result(&[AlertKind::GoldenCross]), &settings, noon())
            .await;

        assert_eq!(
            report.channel(ChannelKind::Email).unwrap().reason,
            Some(DeliveryReason::NoEmailAddress)
        );
        assert_eq!(email.count(), 0);
    }

    #[tokio::test]
    async fn disabled_kinds_are_filtered() {
        let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
        let d = dispatcher(browser.clone(), Arc::new(RecordingChannel::new(ChannelKind::Email)));
        let mut settings = NotificationSettings::default();
        settings.notification_types.insert("golden_cross".into(), false);

        let report = d
            .dispatch_at(&OwnerId::from("u"), &monitor("600519"), &result(&[AlertKind::GoldenCross]), &settings, noon())
            .await;
        assert!(report
            .channels
            .iter()
            .all(|c| c.reason == Some(DeliveryReason::AlertKindsDisabled)));
        assert_eq!(browser.count(), 0);

        d.dispatch_at(
            &OwnerId::from("u"),
            &monitor("600519"),
            &result(&[AlertKind::GoldenCross, AlertKind::VolumeBreakout]),
            &settings,
            noon(),
        )
        .await;
        let delivered = browser.messages();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].alerts.len(), 1);
        assert_eq!(delivered[0].alerts[0].kind, AlertKind::VolumeBreakout);
    }

    #[tokio::test]
    async fn test_notification_uses_one_channel() {
        let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
        let email = Arc::new(RecordingChannel::new(ChannelKind::Email));
        let d = dispatcher(browser.clone(), email.clone());

        let report = d
            .send_test(&OwnerId::from("u"), ChannelKind::Email, &email_settings(), noon())
            .await;
        assert!(report.delivered);
        assert_eq!(email.count(), 1);
        assert_eq!(browser.count(), 0);
        assert_eq!(email.messages()[0].email_subject, "【股票监控】测试通知");
    }
}
