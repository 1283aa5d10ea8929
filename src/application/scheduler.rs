//! Evaluation scheduler.
//!
//! ```text
//! interval tick ──▶ tick_once ──▶ list_active ──▶ JoinSet (≤ max_concurrent_checks)
//!                                                   │ try_lock(in-flight)
//!                                                   ├─ busy ─▶ skipped
//!                                                   └─ OhlcvSource ─▶ Evaluator
//!                                                                      │
//! explicit check ──▶ lock(in-flight) ──────────────────────────────────┤
//!                                                                      ▼
//!                                       record_trigger ─▶ Dispatcher (if counted)
//! ```
//!
//! Each monitor has one in-flight lock. Recurring checks skip a monitor whose
//! lock is held; explicit checks wait for it. Stopping a monitor only goes
//! through the registry, so a check already past its status read completes
//! and dispatches, while the next tick no longer lists the monitor.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::dispatch::Dispatcher;
use super::evaluation::Evaluator;
use super::registry::MonitorRegistry;
use super::settings_cache::SettingsCache;
use crate::domain::{BarPeriod, EvaluationResult, Monitor, MonitorId, OhlcvSeries};
use crate::error::{RegistryError, Result};
use crate::port::inbound::control::CheckOutcome;
use crate::port::outbound::market_data::OhlcvSource;

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between recurring ticks.
    pub interval: Duration,
    /// Upper bound on checks running at once across all monitors.
    pub max_concurrent_checks: usize,
    /// Bar period fetched for recurring checks.
    pub period: BarPeriod,
    /// Bars fetched per recurring check.
    pub bars: usize,
    /// Each check in a tick starts after a random delay up to this value.
    pub start_jitter: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_concurrent_checks: 16,
            period: BarPeriod::Daily,
            bars: 120,
            start_jitter: Duration::ZERO,
        }
    }
}

/// Summary of one recurring tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Monitors evaluated this tick.
    pub checked: usize,
    /// Evaluations that triggered, counted or not.
    pub triggered: usize,
    /// Monitors with a check already in flight, or no longer checkable.
    pub skipped: usize,
    /// Source or evaluation failures, recorded on the monitor.
    pub failed: usize,
}

enum TickOutcome {
    Checked { triggered: bool },
    Skipped,
    Failed,
}

impl TickReport {
    fn record(&mut self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Checked { triggered } => {
                self.checked += 1;
                if triggered {
                    self.triggered += 1;
                }
            }
            TickOutcome::Skipped => self.skipped += 1,
            TickOutcome::Failed => self.failed += 1,
        }
    }
}

/// Handle for stopping a running scheduler loop.
pub struct SchedulerHandle {
    /// Wakes the loop's `select!`.
    shutdown_tx: mpsc::Sender<()>,
    /// The interval loop.
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop to stop and wait for it to exit. Checks spawned by
    /// earlier ticks run to completion on their own.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Scheduler task ended abnormally");
        }
    }

    /// True once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Runs recurring and explicit checks, one at a time per monitor.
pub struct Scheduler {
    /// Monitor state and trigger bookkeeping.
    registry: Arc<MonitorRegistry>,
    /// Pure condition evaluation.
    evaluator: Evaluator,
    /// Alert delivery for counted triggers.
    dispatcher: Arc<Dispatcher>,
    /// Owner settings read before each dispatch.
    settings: Arc<SettingsCache>,
    /// Bars for recurring checks. Without one, recurring ticks do nothing.
    source: Option<Arc<dyn OhlcvSource>>,
    config: SchedulerConfig,
    /// Per-monitor in-flight locks.
    in_flight: DashMap<MonitorId, Arc<Mutex<()>>>,
    /// Bounds concurrent checks across monitors.
    permits: Arc<Semaphore>,
}

impl Scheduler {
    /// Create a scheduler with no market data source attached. A zero
    /// `max_concurrent_checks` is treated as one.
    #[must_use]
    pub fn new(
        registry: Arc<MonitorRegistry>,
        evaluator: Evaluator,
        dispatcher: Arc<Dispatcher>,
        settings: Arc<SettingsCache>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent_checks.max(1))),
            registry,
            evaluator,
            dispatcher,
            settings,
            source: None,
            config,
            in_flight: DashMap::new(),
        }
    }

    /// Market data used by recurring checks.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn OhlcvSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Active tuning.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn flight_lock(&self, id: &MonitorId) -> Arc<Mutex<()>> {
        self.in_flight
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the in-flight lock of a deleted monitor.
    pub fn forget(&self, id: &MonitorId) {
        self.in_flight.remove(id);
    }

    /// Explicit check against caller-supplied bars.
    ///
    /// Waits for any in-flight check of the same monitor to finish first.
    ///
    /// # Errors
    ///
    /// `NotFound` or `NotCheckable` from the registry, or the evaluation
    /// error. Nothing is recorded when evaluation fails.
    pub async fn check(&self, id: &MonitorId, series: OhlcvSeries) -> Result<CheckOutcome> {
        let lock = self.flight_lock(id);
        let _guard = lock.lock().await;

        let monitor = self.checkable(id).await?;
        let result = match self
            .evaluator
            .evaluate(monitor.conditions(), monitor.combine(), &series)
        {
            Ok(result) => result,
            Err(e) => {
                debug!(monitor_id = %id, error = %e, "Explicit check failed evaluation");
                return Err(e.into());
            }
        };
        self.commit(&monitor, result).await
    }

    async fn checkable(&self, id: &MonitorId) -> Result<Monitor> {
        let monitor = self.registry.get(id).await?;
        if !monitor.status().is_checkable() {
            return Err(RegistryError::NotCheckable {
                id: id.clone(),
                status: monitor.status(),
            }
            .into());
        }
        Ok(monitor)
    }

    /// Record the result and dispatch a counted trigger.
    async fn commit(&self, monitor: &Monitor, result: EvaluationResult) -> Result<CheckOutcome> {
        let id = monitor.id();
        let now = Utc::now();

        if !result.triggered {
            self.registry.record_check(id, now, None).await?;
            return Ok(CheckOutcome {
                monitor_id: id.clone(),
                trigger_count: monitor.trigger_count(),
                counted: false,
                delivery: None,
                result,
            });
        }

        let record = self
            .registry
            .record_trigger(id, result.evaluated_at, now)
            .await?;

        let delivery = if record.counted {
            info!(
                monitor_id = %id,
                stock_code = %monitor.stock_code(),
                trigger_count = record.trigger_count,
                alerts = result.alerts.len(),
                "Monitor triggered"
            );
            let owner = monitor.owner();
            let settings = match self.settings.get(owner).await {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(owner = %owner, error = %e, "Settings unavailable, using defaults");
                    Default::default()
                }
            };
            Some(
                self.dispatcher
                    .dispatch(owner, monitor, &result, &settings)
                    .await,
            )
        } else {
            debug!(monitor_id = %id, bar_at = %result.evaluated_at, "Trigger already counted for bar");
            None
        };

        Ok(CheckOutcome {
            monitor_id: id.clone(),
            trigger_count: record.trigger_count,
            counted: record.counted,
            delivery,
            result,
        })
    }

    /// One recurring check. Errors are recorded on the monitor and never
    /// change its status.
    async fn recurring_check(&self, id: &MonitorId, source: &dyn OhlcvSource) -> TickOutcome {
        let lock = self.flight_lock(id);
        let Ok(_guard) = lock.try_lock() else {
            debug!(monitor_id = %id, "Check already in flight, skipping tick");
            return TickOutcome::Skipped;
        };

        let monitor = match self.checkable(id).await {
            Ok(monitor) => monitor,
            Err(e) => {
                debug!(monitor_id = %id, reason = %e, "Monitor no longer checkable");
                return TickOutcome::Skipped;
            }
        };

        let evaluated = match source
            .fetch(monitor.stock_code(), self.config.period, self.config.bars)
            .await
        {
            Ok(series) => self
                .evaluator
                .evaluate(monitor.conditions(), monitor.combine(), &series)
                .map_err(crate::error::Error::from),
            Err(e) => Err(e),
        };

        let result = match evaluated {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    monitor_id = %id,
                    stock_code = %monitor.stock_code(),
                    source = source.name(),
                    error = %e,
                    "Recurring check failed"
                );
                if let Err(e) = self
                    .registry
                    .record_check(id, Utc::now(), Some(e.to_string()))
                    .await
                {
                    warn!(monitor_id = %id, error = %e, "Could not record check failure");
                }
                return TickOutcome::Failed;
            }
        };

        match self.commit(&monitor, result).await {
            Ok(outcome) => TickOutcome::Checked {
                triggered: outcome.result.triggered,
            },
            Err(e) => {
                warn!(monitor_id = %id, error = %e, "Recording check result failed");
                TickOutcome::Failed
            }
        }
    }

    fn jitter(&self) -> Duration {
        let max = u64::try_from(self.config.start_jitter.as_millis()).unwrap_or(u64::MAX);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }

    /// Run one recurring pass over every checkable monitor.
    ///
    /// # Errors
    ///
    /// Only listing the registry can fail; per-monitor failures are counted
    /// in the report.
    pub async fn tick_once(self: &Arc<Self>) -> Result<TickReport> {
        let Some(source) = self.source.clone() else {
            warn!("No market data source configured, skipping tick");
            return Ok(TickReport::default());
        };

        let monitors = self.registry.list_active(None).await?;
        let mut tasks = JoinSet::new();
        for monitor in monitors {
            let this = Arc::clone(self);
            let source = Arc::clone(&source);
            let delay = self.jitter();
            tasks.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let Ok(_permit) = Arc::clone(&this.permits).acquire_owned().await else {
                    return TickOutcome::Skipped;
                };
                this.recurring_check(monitor.id(), source.as_ref()).await
            });
        }

        let mut report = TickReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!(error = %e, "Check task aborted");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Start the recurring loop. Each tick runs in its own task, so a slow
    /// tick never delays the next one; overlapping checks of one monitor are
    /// skipped.
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                interval_secs = self.config.interval.as_secs(),
                max_concurrent_checks = self.config.max_concurrent_checks,
                "Scheduler started"
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            match this.tick_once().await {
                                Ok(report) => debug!(
                                    checked = report.checked,
                                    triggered = report.triggered,
                                    skipped = report.skipped,
                                    failed = report.failed,
                                    "Tick complete"
                                ),
                                Err(e) => warn!(error = %e, "Tick failed"),
                            }
                        });
                    }
                }
            }
        });

        SchedulerHandle { shutdown_tx, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::{MemoryMonitorStore, MemorySettingsStore};
    use crate::application::dispatch::DispatchConfig;
    use crate::domain::{ChannelKind, MonitorStatus};
    use crate::error::{Error, EvaluationError};
    use crate::port::outbound::notifier::ChannelRegistry;
    use crate::testkit::bars;
    use crate::testkit::domain::monitor;
    use crate::testkit::stub::{RecordingChannel, StaticSource};

    struct Fixture {
        scheduler: Arc<Scheduler>,
        registry: Arc<MonitorRegistry>,
        browser: Arc<RecordingChannel>,
        source: Arc<StaticSource>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(MonitorRegistry::new(Arc::new(MemoryMonitorStore::new())));
        let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
        let mut channels = ChannelRegistry::new();
        channels.register(browser.clone());
        let dispatcher = Arc::new(Dispatcher::new(channels, DispatchConfig::default()));
        let settings = Arc::new(SettingsCache::new(
            Arc::new(MemorySettingsStore::new()),
            Duration::from_secs(60),
        ));
        let source = Arc::new(StaticSource::new());
        let scheduler = Arc::new(
            Scheduler::new(
                Arc::clone(&registry),
                Evaluator::default(),
                dispatcher,
                settings,
                SchedulerConfig::default(),
            )
            .with_source(source.clone()),
        );
        Fixture {
            scheduler,
            registry,
            browser,
            source,
        }
    }

    async fn active(registry: &MonitorRegistry) -> MonitorId {
        let id = registry.create(&monitor("600519")).await.unwrap();
        registry.set_status(&id, MonitorStatus::Active).await.unwrap();
        id
    }

    #[tokio::test]
    async fn explicit_check_triggers_and_dispatches() {
        let f = fixture();
        let id = active(&f.registry).await;

        let outcome = f.scheduler.check(&id, bars::golden_cross()).await.unwrap();

        assert!(outcome.result.triggered);
        assert!(outcome.counted);
        assert_eq!(outcome.trigger_count, 1);
        assert!(outcome.result.alerts[0].message.contains("金叉"));
        assert!(outcome.delivery.unwrap().any_delivered());
        assert_eq!(f.browser.count(), 1);

        let stored = f.registry.get(&id).await.unwrap();
        assert_eq!(stored.status(), MonitorStatus::Triggered);
        assert!(stored.last_check_at().is_some());
    }

    #[tokio::test]
    async fn same_bar_is_not_dispatched_twice() {
        let f = fixture();
        let id = active(&f.registry).await;

        f.scheduler.check(&id, bars::golden_cross()).await.unwrap();
        let again = f.scheduler.check(&id, bars::golden_cross()).await.unwrap();

        assert!(again.result.triggered);
        assert!(!again.counted);
        assert!(again.delivery.is_none());
        assert_eq!(again.trigger_count, 1);
        assert_eq!(f.browser.count(), 1);
    }

    #[tokio::test]
    async fn quiet_series_only_updates_last_check() {
        let f = fixture();
        let id = active(&f.registry).await;
        let before = f.registry.get(&id).await.unwrap();

        let outcome = f.scheduler.check(&id, bars::flat(20, 10.0)).await.unwrap();

        assert!(!outcome.result.triggered);
        let after = f.registry.get(&id).await.unwrap();
        assert_eq!(after.status(), MonitorStatus::Active);
        assert_eq!(after.trigger_count(), 0);
        assert!(after.last_check_at().is_some());
        assert_eq!(after.intent(), before.intent());
    }

    #[tokio::test]
    async fn evaluation_error_propagates_without_mutation() {
        let f = fixture();
        let id = active(&f.registry).await;
        let before = f.registry.get(&id).await.unwrap();

        let err = f
            .scheduler
            .check(&id, OhlcvSeries::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Evaluation(EvaluationError::EmptySeries)));
        assert_eq!(f.registry.get(&id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn pending_monitor_is_not_checkable() {
        let f = fixture();
        let id = f.registry.create(&monitor("600519")).await.unwrap();
        let err = f.scheduler.check(&id, bars::golden_cross()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::NotCheckable { .. })
        ));
    }

    #[tokio::test]
    async fn tick_checks_active_monitors() {
        let f = fixture();
        let id = active(&f.registry).await;
        f.source.set("600519", bars::golden_cross());

        let report = f.scheduler.tick_once().await.unwrap();

        assert_eq!(report.checked, 1);
        assert_eq!(report.triggered, 1);
        assert_eq!(f.registry.get(&id).await.unwrap().trigger_count(), 1);
    }

    #[tokio::test]
    async fn tick_skips_monitor_with_check_in_flight() {
        let f = fixture();
        let id = active(&f.registry).await;
        f.source.set("600519", bars::golden_cross());

        let lock = f.scheduler.flight_lock(&id);
        let guard = lock.lock().await;
        let report = f.scheduler.tick_once().await.unwrap();
        drop(guard);

        assert_eq!(report.skipped, 1);
        assert_eq!(report.checked, 0);
        assert_eq!(f.registry.get(&id).await.unwrap().trigger_count(), 0);
    }

    #[tokio::test]
    async fn recurring_failure_records_error_and_keeps_status() {
        let f = fixture();
        let id = active(&f.registry).await;
        f.source.fail("600519", "upstream timeout");

        let report = f.scheduler.tick_once().await.unwrap();

        assert_eq!(report.failed, 1);
        let stored = f.registry.get(&id).await.unwrap();
        assert_eq!(stored.status(), MonitorStatus::Active);
        assert!(stored.last_error().unwrap().contains("upstream timeout"));

        f.source.set("600519", bars::flat(20, 10.0));
        f.scheduler.tick_once().await.unwrap();
        assert!(f.registry.get(&id).await.unwrap().last_error().is_none());
    }

    #[tokio::test]
    async fn stopped_monitor_is_not_ticked() {
        let f = fixture();
        let id = active(&f.registry).await;
        f.source.set("600519", bars::golden_cross());
        f.registry.set_status(&id, MonitorStatus::Stopped).await.unwrap();

        let report = f.scheduler.tick_once().await.unwrap();

        assert_eq!(report, TickReport::default());
        assert_eq!(f.source.fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ticks_until_shutdown() {
        let f = fixture();
        active(&f.registry).await;
        f.source.set("600519", bars::flat(20, 10.0));

        let handle = Arc::clone(&f.scheduler).start();
        tokio::time::sleep(Duration::from_secs(150)).await;
        handle.shutdown().await;
        let fetched = f.source.fetches();
        assert!(fetched >= 2, "expected at least two ticks, got {fetched}");

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(f.source.fetches(), fetched);
    }
}
