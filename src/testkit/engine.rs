//! Fully wired in-memory engine for service-level tests.

use std::sync::Arc;
use std::time::Duration;

use crate::adapter::outbound::memory::{MemoryMonitorStore, MemorySettingsStore};
use crate::application::dispatch::{DispatchConfig, Dispatcher};
use crate::application::evaluation::Evaluator;
use crate::application::registry::MonitorRegistry;
use crate::application::scheduler::{Scheduler, SchedulerConfig};
use crate::application::service::MonitorService;
use crate::application::settings_cache::SettingsCache;
use crate::application::synthesis::Synthesizer;
use crate::domain::{ChannelKind, MonitorId, OwnerId};
use crate::port::inbound::control::MonitorControl;
use crate::port::outbound::notifier::ChannelRegistry;

use super::domain::draft;
use super::stub::{RecordingChannel, StaticSource};

pub struct Engine {
    pub service: Arc<MonitorService>,
    pub scheduler: Arc<Scheduler>,
    pub registry: Arc<MonitorRegistry>,
    pub settings: Arc<MemorySettingsStore>,
    pub source: Arc<StaticSource>,
    pub browser: Arc<RecordingChannel>,
    pub email: Arc<RecordingChannel>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_source(StaticSource::new(), SchedulerConfig::default())
    }

    /// Engine using `source` for recurring checks.
    pub fn with_source(source: StaticSource, config: SchedulerConfig) -> Self {
        let source = Arc::new(source);
        let registry = Arc::new(MonitorRegistry::new(Arc::new(MemoryMonitorStore::new())));
        let settings = Arc::new(MemorySettingsStore::new());
        let settings_cache = Arc::new(SettingsCache::new(
            settings.clone(),
            Duration::ZERO,
        ));

        let browser = Arc::new(RecordingChannel::new(ChannelKind::Browser));
        let email = Arc::new(RecordingChannel::new(ChannelKind::Email));
        let mut channels = ChannelRegistry::new();
        channels.register(browser.clone());
        channels.register(email.clone());
        let dispatcher = Arc::new(Dispatcher::new(channels, DispatchConfig::default()));

        let scheduler = Arc::new(
            Scheduler::new(
                Arc::clone(&registry),
                Evaluator::default(),
                Arc::clone(&dispatcher),
                Arc::clone(&settings_cache),
                config,
            )
            .with_source(source.clone()),
        );
        let service = Arc::new(MonitorService::new(
            Arc::new(Synthesizer::default()),
            Arc::clone(&registry),
            Arc::clone(&scheduler),
            dispatcher,
            settings_cache,
        ));

        Self {
            service,
            scheduler,
            registry,
            settings,
            source,
            browser,
            email,
        }
    }

    /// Activate a golden-cross monitor for `stock_code`.
    ///
    /// # Panics
    ///
    /// If activation fails.
    pub async fn active_monitor(&self, owner: &str, stock_code: &str) -> MonitorId {
        self.service
            .activate(&OwnerId::from(owner), draft(stock_code))
            .await
            .expect("activate golden cross monitor")
    }
}
