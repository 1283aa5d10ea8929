use std::sync::Arc;
use std::time::Duration;

use stockwatch::adapter::outbound::sqlite::{SqliteMonitorStore, SqliteSettingsStore};
use stockwatch::application::dispatch::{DispatchConfig, Dispatcher};
use stockwatch::application::evaluation::Evaluator;
use stockwatch::application::registry::MonitorRegistry;
use stockwatch::application::scheduler::{Scheduler, SchedulerConfig};
use stockwatch::application::service::MonitorService;
use stockwatch::application::settings_cache::SettingsCache;
use stockwatch::application::synthesis::Synthesizer;
use stockwatch::domain::ChannelKind;
use stockwatch::port::outbound::notifier::ChannelRegistry;
use stockwatch::testkit::stub::{RecordingChannel, StaticSource};

use super::temp_db::TempDb;

/// Engine persisting to SQLite, delivering to recording channels.
pub struct SqliteEngine {
    pub service: Arc<MonitorService>,
    pub scheduler: Arc<Scheduler>,
    pub source: Arc<StaticSource>,
    pub browser: Arc<RecordingChannel>,
    pub email: Arc<RecordingChannel>,
}

impl SqliteEngine {
    pub fn open(db: &TempDb) -> Self {
        let source = Arc::new(StaticSource::new());
        let registry = Arc::new(MonitorRegistry::new(Arc::new(SqliteMonitorStore::new(
            db.pool().clone(),
        ))));
        let settings = Arc::new(SettingsCache::new(
            Arc::new(SqliteSettingsStore::new(db.pool().clone())),
            Duration::from_secs(60),
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
                Arc::clone(&settings),
                SchedulerConfig::default(),
            )
            .with_source(source.clone()),
        );
        let service = Arc::new(MonitorService::new(
            Arc::new(Synthesizer::default()),
            registry,
            Arc::clone(&scheduler),
            dispatcher,
            settings,
        ));

        Self {
            service,
            scheduler,
            source,
            browser,
            email,
        }
    }
}
