use std::sync::Arc;
use std::time::Duration;

use stockwatch::application::scheduler::{SchedulerConfig, TickReport};
use stockwatch::domain::MonitorStatus;
use stockwatch::port::inbound::control::MonitorControl;
use stockwatch::testkit::bars;
use stockwatch::testkit::engine::Engine;
use stockwatch::testkit::stub::StaticSource;

#[tokio::test]
async fn deactivation_during_an_inflight_check_lets_it_finish_then_stops_ticks() {
    let (source, gate) = StaticSource::gated();
    source.set("600519", bars::golden_cross());
    let engine = Engine::with_source(source, SchedulerConfig::default());
    let id = engine.active_monitor("investor", "600519").await;

    let scheduler = Arc::clone(&engine.scheduler);
    let tick = tokio::spawn(async move { scheduler.tick_once().await });

    gate.entered().await;
    engine.service.deactivate(&id).await.unwrap();
    gate.release(1);

    let report = tick.await.unwrap().unwrap();
    assert_eq!(
        report,
        TickReport {
            checked: 1,
            triggered: 1,
            skipped: 0,
            failed: 0,
        }
    );

    let monitor = engine.service.get_monitor(&id).await.unwrap();
    assert_eq!(monitor.status(), MonitorStatus::Stopped);
    assert_eq!(monitor.trigger_count(), 1);
    assert_eq!(engine.browser.count(), 1);

    gate.release(1);
    let report = engine.scheduler.tick_once().await.unwrap();
    assert_eq!(report, TickReport::default());
    assert_eq!(engine.source.fetches(), 1);
}

#[tokio::test]
async fn explicit_check_waits_for_the_recurring_one() {
    let (source, gate) = StaticSource::gated();
    source.set("600519", bars::golden_cross());
    let engine = Engine::with_source(source, SchedulerConfig::default());
    let id = engine.active_monitor("investor", "600519").await;

    let scheduler = Arc::clone(&engine.scheduler);
    let tick = tokio::spawn(async move { scheduler.tick_once().await });
    gate.entered().await;

    let service = Arc::clone(&engine.service);
    let check_id = id.clone();
    let explicit =
        tokio::spawn(async move { service.check(&check_id, bars::golden_cross()).await });
    tokio::task::yield_now().await;
    assert!(!explicit.is_finished());

    gate.release(1);
    tick.await.unwrap().unwrap();
    let outcome = explicit.await.unwrap().unwrap();

    // Same bar: the explicit check sees the trigger already counted.
    assert!(outcome.result.triggered);
    assert!(!outcome.counted);
    assert_eq!(outcome.trigger_count, 1);
    assert_eq!(engine.browser.count(), 1);
}

#[tokio::test]
async fn source_failures_are_isolated_per_monitor() {
    let source = StaticSource::new();
    source.set("600519", bars::golden_cross());
    source.fail("000001", "upstream timeout");
    let engine = Engine::with_source(source, SchedulerConfig::default());
    let ok = engine.active_monitor("investor", "600519").await;
    let broken = engine.active_monitor("investor", "000001").await;

    let report = engine.scheduler.tick_once().await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.failed, 1);

    let ok = engine.service.get_monitor(&ok).await.unwrap();
    assert_eq!(ok.status(), MonitorStatus::Triggered);

    let broken = engine.service.get_monitor(&broken).await.unwrap();
    assert_eq!(broken.status(), MonitorStatus::Active);
    assert!(broken.last_error().unwrap().contains("upstream timeout"));
    assert!(broken.last_check_at().is_some());
}

#[tokio::test(start_paused = true)]
async fn recurring_loop_checks_each_interval_until_shutdown() {
    let source = StaticSource::new();
    source.set("600519", bars::flat(30, 10.0));
    let config = SchedulerConfig {
        interval: Duration::from_secs(60),
        ..SchedulerConfig::default()
    };
    let engine = Engine::with_source(source, config);
    engine.active_monitor("investor", "600519").await;

    let handle = Arc::clone(&engine.scheduler).start();

    // The first tick fires immediately.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(engine.source.fetches(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(engine.source.fetches(), 2);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(engine.source.fetches(), 4);

    handle.shutdown().await;
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(engine.source.fetches(), 4);
    assert_eq!(engine.browser.count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_explicit_checks_count_a_trigger_once() {
    let engine = Engine::new();
    let id = engine.active_monitor("investor", "600519").await;

    let checks: Vec<_> = (0..2)
        .map(|_| {
            let service = Arc::clone(&engine.service);
            let id = id.clone();
            tokio::spawn(async move { service.check(&id, bars::golden_cross()).await })
        })
        .collect();

    let mut counted = 0;
    for check in checks {
        let outcome = check.await.unwrap().unwrap();
        assert!(outcome.result.triggered);
        assert_eq!(outcome.trigger_count, 1);
        if outcome.counted {
            counted += 1;
        }
    }

    assert_eq!(counted, 1);
    let monitor = engine.service.get_monitor(&id).await.unwrap();
    assert_eq!(monitor.trigger_count(), 1);
    assert_eq!(monitor.status(), MonitorStatus::Triggered);
    assert_eq!(engine.browser.count(), 1);
}
