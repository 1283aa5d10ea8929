//! Composition root: builds the engine from a [`Config`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapter::outbound::llm::{LlmScriptGenerator, OpenAi};
use crate::adapter::outbound::market_data::{HttpKlineSource, JsonFileSource};
use crate::adapter::outbound::notifier::{
    BrowserChannel, EmailChannel, HttpEmailRelay, UnconfiguredTransport,
};
use crate::adapter::outbound::sqlite::{
    create_pool, run_migrations, SqliteMonitorStore, SqliteSettingsStore,
};
use crate::application::dispatch::Dispatcher;
use crate::application::evaluation::Evaluator;
use crate::application::registry::MonitorRegistry;
use crate::application::scheduler::Scheduler;
use crate::application::service::MonitorService;
use crate::application::settings_cache::SettingsCache;
use crate::application::synthesis::rules::RuleTable;
use crate::application::synthesis::Synthesizer;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::llm::LlmProvider;
use crate::infrastructure::config::market_data::SourceKind;
use crate::infrastructure::config::Config;
use crate::port::outbound::market_data::OhlcvSource;
use crate::port::outbound::notifier::{ChannelRegistry, EmailTransport};

/// Everything a front end needs to drive the engine.
pub struct Runtime {
    pub service: Arc<MonitorService>,
    pub scheduler: Arc<Scheduler>,
    /// Subscribe here to receive browser notifications.
    pub browser: Arc<BrowserChannel>,
    /// Market data used by recurring checks.
    pub source: Arc<dyn OhlcvSource>,
}

/// Wire stores, channels, data source, synthesizer and scheduler.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated, or an
/// adapter rejects its configuration.
pub fn build(config: &Config) -> Result<Runtime> {
    let pool = create_pool(&config.database)?;
    run_migrations(&pool)?;
    info!(database = %config.database, "Database ready");

    let registry = Arc::new(MonitorRegistry::new(Arc::new(SqliteMonitorStore::new(
        pool.clone(),
    ))));
    let settings = Arc::new(SettingsCache::new(
        Arc::new(SqliteSettingsStore::new(pool)),
        config
            .notifications
            .settings_ttl(config.scheduler.interval()),
    ));

    let browser = Arc::new(BrowserChannel::new(config.notifications.browser_buffer));
    let mut channels = ChannelRegistry::new();
    channels.register(browser.clone());
    channels.register(Arc::new(EmailChannel::new(build_email_transport(config)?)));
    let dispatcher = Arc::new(Dispatcher::new(
        channels,
        config.notifications.to_dispatch_config(),
    ));

    let source = build_source(config)?;
    let scheduler = Arc::new(
        Scheduler::new(
            Arc::clone(&registry),
            Evaluator::new(config.scheduler.timestamp_tolerance()),
            Arc::clone(&dispatcher),
            Arc::clone(&settings),
            config.scheduler.to_scheduler_config(),
        )
        .with_source(Arc::clone(&source)),
    );

    let service = Arc::new(MonitorService::new(
        Arc::new(build_synthesizer(config)),
        registry,
        Arc::clone(&scheduler),
        dispatcher,
        settings,
    ));

    Ok(Runtime {
        service,
        scheduler,
        browser,
        source,
    })
}

fn build_email_transport(config: &Config) -> Result<Arc<dyn EmailTransport>> {
    let email = &config.notifications.email;
    match &email.relay_url {
        Some(url) => {
            let relay = HttpEmailRelay::new(
                url,
                email.sender.clone(),
                config.notifications.delivery_timeout(),
            )?
            .with_env_token();
            info!(relay = %url, "Email relay configured");
            Ok(Arc::new(relay))
        }
        None => Ok(Arc::new(UnconfiguredTransport)),
    }
}

pub(crate) fn build_source(config: &Config) -> Result<Arc<dyn OhlcvSource>> {
    let market_data = &config.market_data;
    match market_data.source {
        SourceKind::File => Ok(Arc::new(JsonFileSource::new(market_data.dir.clone()))),
        SourceKind::Http => {
            let base_url = market_data
                .base_url
                .as_deref()
                .ok_or(ConfigError::MissingField {
                    field: "market_data.base_url",
                })?;
            Ok(Arc::new(HttpKlineSource::new(
                base_url,
                Duration::from_secs(market_data.timeout_secs),
            )?))
        }
    }
}

/// Rule-based synthesizer, with the LLM generator attached when enabled and
/// an API key is available.
pub(crate) fn build_synthesizer(config: &Config) -> Synthesizer {
    let synthesizer = Synthesizer::new(
        RuleTable::with_defaults(),
        config.synthesis.combine_policy,
        config.synthesis.default_dialect,
    );
    if !config.synthesis.use_generator {
        return synthesizer;
    }

    let llm = &config.llm;
    let client = match llm.provider {
        LlmProvider::OpenAi => OpenAi::from_env(&llm.model, llm.max_tokens, llm.temperature),
    };
    let client = match (client, &llm.api_url) {
        (Ok(client), Some(url)) => client.with_api_url(url),
        (client, _) => client,
    };
    match client {
        Ok(client) => {
            info!(model = %llm.model, "Script generator enabled");
            synthesizer.with_generator(Arc::new(LlmScriptGenerator::new(Arc::new(client))))
        }
        Err(e) => {
            warn!(error = %e, "Script generator unavailable, using built-in renderer");
            synthesizer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::inbound::control::MonitorControl;
    use crate::testkit::domain::{draft, TEST_OWNER};
    use crate::domain::{MonitorStatus, OwnerId};

    fn config_in(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.database = dir.path().join("engine.db").to_string_lossy().into_owned();
        config.market_data.dir = dir.path().to_path_buf();
        config
    }

    #[tokio::test]
    async fn built_runtime_persists_monitors() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let owner = OwnerId::from(TEST_OWNER);

        let id = {
            let runtime = build(&config).unwrap();
            runtime.service.activate(&owner, draft("600519")).await.unwrap()
        };

        let reopened = build(&config).unwrap();
        let monitor = reopened.service.get_monitor(&id).await.unwrap();
        assert_eq!(monitor.status(), MonitorStatus::Active);
        assert_eq!(reopened.service.list_monitors(&owner).await.unwrap().len(), 1);
    }

    #[test]
    fn generator_is_skipped_when_disabled() {
        let config = Config::default();
        assert!(!build_synthesizer(&config).has_generator());
    }

    #[test]
    fn http_source_requires_base_url() {
        let mut config = Config::default();
        config.market_data.source = SourceKind::Http;
        assert!(build_source(&config).is_err());

        config.market_data.base_url = Some("http://127.0.0.1:8000".into());
        assert_eq!(build_source(&config).unwrap().name(), "http");
    }
}
