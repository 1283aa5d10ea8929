use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use stockwatch::adapter::outbound::notifier::EmailChannel;
use stockwatch::application::dispatch::{DispatchConfig, Dispatcher};
use stockwatch::application::evaluation::Evaluator;
use stockwatch::domain::{
    ChannelKind, DeliveryReason, EvaluationResult, Monitor, NotificationSettings, OwnerId,
};
use stockwatch::testkit::bars;
use stockwatch::testkit::domain::{monitor, settings_with_email};
use stockwatch::testkit::stub::{FailingChannel, RecordingChannel, RecordingTransport};

struct Fixture {
    dispatcher: Dispatcher,
    browser: Arc<RecordingChannel>,
    mail: Arc<RecordingTransport>,
}

fn fixture() -> Fixture {
    let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
    let mail = Arc::new(RecordingTransport::new());
    let mut channels = stockwatch::port::outbound::notifier::ChannelRegistry::new();
    channels.register(browser.clone());
    channels.register(Arc::new(EmailChannel::new(mail.clone())));
    Fixture {
        dispatcher: Dispatcher::new(channels, DispatchConfig::default()),
        browser,
        mail,
    }
}

fn triggered(m: &Monitor) -> EvaluationResult {
    let result = Evaluator::default()
        .evaluate(m.conditions(), m.combine(), &bars::golden_cross())
        .unwrap();
    assert!(result.triggered);
    result
}

fn utc(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

/// Email on, quiet 22:00-07:00 on a UTC+8 clock.
fn overnight_quiet() -> NotificationSettings {
    let mut settings = settings_with_email("me@example.com");
    settings.quiet_hours_start = NaiveTime::from_hms_opt(22, 0, 0);
    settings.quiet_hours_end = NaiveTime::from_hms_opt(7, 0, 0);
    settings.utc_offset_minutes = 8 * 60;
    settings
}

#[tokio::test]
async fn quiet_hours_on_the_owner_clock_hold_back_email_only() {
    let f = fixture();
    let owner = OwnerId::from("investor");
    let m = monitor("600519");

    // 15:00 UTC is 23:00 in UTC+8.
    let report = f
        .dispatcher
        .dispatch_at(&owner, &m, &triggered(&m), &overnight_quiet(), utc(15))
        .await;

    assert!(report.channel(ChannelKind::Browser).unwrap().delivered);
    let email = report.channel(ChannelKind::Email).unwrap();
    assert!(!email.attempted);
    assert_eq!(email.reason, Some(DeliveryReason::QuietHours));
    assert!(f.mail.sent().is_empty());
    assert_eq!(f.browser.count(), 1);
}

#[tokio::test]
async fn daytime_alert_reaches_both_channels() {
    let f = fixture();
    let owner = OwnerId::from("investor");
    let m = monitor("600519");

    // 02:00 UTC is 10:00 in UTC+8.
    let report = f
        .dispatcher
        .dispatch_at(&owner, &m, &triggered(&m), &overnight_quiet(), utc(2))
        .await;

    assert!(report.channels.iter().all(|c| c.delivered));
    let sent = f.mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "me@example.com");
    assert!(sent[0].subject.starts_with("【股票监控】"));
    assert!(sent[0].subject.contains("600519"));
    assert!(sent[0].text.contains("金叉"));
}

#[tokio::test]
async fn disabled_alert_kind_suppresses_every_channel() {
    let f = fixture();
    let owner = OwnerId::from("investor");
    let m = monitor("600519");
    let mut settings = settings_with_email("me@example.com");
    settings
        .notification_types
        .insert("golden_cross".into(), false);

    let report = f
        .dispatcher
        .dispatch_at(&owner, &m, &triggered(&m), &settings, utc(2))
        .await;

    assert_eq!(report.channels.len(), 2);
    for channel in &report.channels {
        assert!(!channel.attempted);
        assert_eq!(channel.reason, Some(DeliveryReason::AlertKindsDisabled));
    }
    assert_eq!(f.browser.count(), 0);
    assert!(f.dispatcher.history().list(&owner, 10).is_empty());
}

#[tokio::test]
async fn missing_address_and_transport_errors_are_reported_per_channel() {
    let owner = OwnerId::from("investor");
    let m = monitor("600519");
    let mut settings = NotificationSettings::default();
    settings.email_enabled = true;

    let f = fixture();
    let report = f
        .dispatcher
        .dispatch_at(&owner, &m, &triggered(&m), &settings, utc(2))
        .await;
    assert_eq!(
        report.channel(ChannelKind::Email).unwrap().reason,
        Some(DeliveryReason::NoEmailAddress)
    );
    assert!(report.channel(ChannelKind::Browser).unwrap().delivered);

    let mut channels = stockwatch::port::outbound::notifier::ChannelRegistry::new();
    channels.register(Arc::new(FailingChannel::new(ChannelKind::Browser)));
    let failing = Dispatcher::new(channels, DispatchConfig::default());
    let report = failing
        .dispatch_at(&owner, &m, &triggered(&m), &settings, utc(2))
        .await;
    let browser = report.channel(ChannelKind::Browser).unwrap();
    assert!(browser.attempted);
    assert!(matches!(browser.reason, Some(DeliveryReason::Failed(_))));
    assert_eq!(failing.history().list(&owner, 10).len(), 1);
}
