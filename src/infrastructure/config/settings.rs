//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. The file
//! holds no secrets: API keys and relay tokens come from the environment.
//!
//! # Example
//!
//! ```no_run
//! use stockwatch::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::llm::LlmConfig;
use super::logging::LoggingConfig;
use super::market_data::{MarketDataSection, SourceKind};
use super::notification::NotificationSection;
use super::scheduler::SchedulerSection;
use super::synthesis::SynthesisSection;
use crate::error::{ConfigError, Result};

fn default_database_path() -> String {
    "stockwatch.db".into()
}

/// Main application configuration. Every section is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// SQLite database path.
    #[serde(default = "default_database_path")]
    pub database: String,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub synthesis: SynthesisSection,

    #[serde(default)]
    pub notifications: NotificationSection,

    #[serde(default)]
    pub market_data: MarketDataSection,

    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            database: default_database_path(),
            scheduler: SchedulerSection::default(),
            synthesis: SynthesisSection::default(),
            notifications: NotificationSection::default(),
            market_data: MarketDataSection::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `path` when it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file fails to load.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns the first field that is missing or out of range.
    pub fn validate(&self) -> Result<()> {
        if !self.logging.is_known_format() {
            return Err(invalid("logging.format", "expected \"pretty\" or \"json\""));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }

        let scheduler = &self.scheduler;
        if scheduler.interval_secs == 0 {
            return Err(invalid("scheduler.interval_secs", "must be greater than 0"));
        }
        if scheduler.max_concurrent_checks == 0 {
            return Err(invalid(
                "scheduler.max_concurrent_checks",
                "must be greater than 0",
            ));
        }
        if scheduler.bars < 2 {
            return Err(invalid("scheduler.bars", "must be at least 2"));
        }

        let notifications = &self.notifications;
        if notifications.delivery_timeout_secs == 0 {
            return Err(invalid(
                "notifications.delivery_timeout_secs",
                "must be greater than 0",
            ));
        }
        if notifications.history_limit == 0 {
            return Err(invalid(
                "notifications.history_limit",
                "must be greater than 0",
            ));
        }
        if notifications.browser_buffer == 0 {
            return Err(invalid(
                "notifications.browser_buffer",
                "must be greater than 0",
            ));
        }
        if let Some(url) = &notifications.email.relay_url {
            check_url("notifications.email.relay_url", url)?;
            if notifications.email.sender.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "notifications.email.sender",
                }
                .into());
            }
        }

        match self.market_data.source {
            SourceKind::File => {}
            SourceKind::Http => match &self.market_data.base_url {
                Some(url) => check_url("market_data.base_url", url)?,
                None => {
                    return Err(ConfigError::MissingField {
                        field: "market_data.base_url",
                    }
                    .into())
                }
            },
        }
        if self.market_data.timeout_secs == 0 {
            return Err(invalid("market_data.timeout_secs", "must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("llm.temperature", "must be between 0.0 and 2.0"));
        }
        if self.llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens", "must be greater than 0"));
        }
        if let Some(url) = &self.llm.api_url {
            check_url("llm.api_url", url)?;
        }

        Ok(())
    }

    /// Install the global tracing subscriber described by `[logging]`.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

fn check_url(field: &'static str, url: &str) -> Result<()> {
    Url::parse(url).map_err(|e| invalid(field, &e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::synthesis::CombinePolicy;
    use crate::domain::{BarPeriod, ScriptDialect};
    use crate::error::Error;
    use std::time::Duration;

    fn invalid_field(result: Result<Config>) -> &'static str {
        match result {
            Err(Error::Config(ConfigError::InvalidValue { field, .. }))
            | Err(Error::Config(ConfigError::MissingField { field })) => field,
            other => panic!("expected a field error, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.database, "stockwatch.db");
        assert_eq!(config.scheduler.interval_secs, 60);
        assert_eq!(config.scheduler.max_concurrent_checks, 16);
        assert_eq!(config.scheduler.period, BarPeriod::Daily);
        assert_eq!(config.notifications.history_limit, 200);
        assert_eq!(config.synthesis.combine_policy, CombinePolicy::ExplicitOr);
        assert_eq!(config.market_data.source, SourceKind::File);
        assert!(config.notifications.email.relay_url.is_none());
    }

    #[test]
    fn settings_ttl_follows_the_scheduler_interval() {
        let config = Config::parse_toml("[scheduler]\ninterval_secs = 300").unwrap();
        let ttl = config
            .notifications
            .settings_ttl(config.scheduler.interval());
        assert_eq!(ttl, Duration::from_secs(300));

        let config = Config::parse_toml("[notifications]\nsettings_ttl_secs = 5").unwrap();
        let ttl = config
            .notifications
            .settings_ttl(config.scheduler.interval());
        assert_eq!(ttl, Duration::from_secs(5));
    }

    #[test]
    fn full_file_parses() {
        let toml = r#"
            database = "/var/lib/stockwatch/monitors.db"

            [logging]
            level = "debug"
            format = "json"

            [scheduler]
            interval_secs = 30
            period = "60min"
            bars = 200
            start_jitter_ms = 250

            [synthesis]
            default_dialect = "pinescript"
            combine_policy = "always_and"
            use_generator = true

            [notifications]
            delivery_timeout_secs = 5
            [notifications.email]
            sender = "alerts@example.com"
            relay_url = "https://relay.example.com/send"

            [market_data]
            source = "http"
            base_url = "http://127.0.0.1:8000/api"

            [llm]
            model = "gpt-4o"
            temperature = 0.0
        "#;
        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.scheduler.period, BarPeriod::Minute60);
        assert_eq!(config.synthesis.default_dialect, ScriptDialect::PineScript);
        assert_eq!(config.synthesis.combine_policy, CombinePolicy::AlwaysAnd);
        assert!(config.synthesis.use_generator);
        assert_eq!(config.market_data.source, SourceKind::Http);
        assert_eq!(
            config.scheduler.to_scheduler_config().start_jitter,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = Config::parse_toml("[scheduler]\ninterval_secs = 0");
        assert_eq!(invalid_field(result), "scheduler.interval_secs");
    }

    #[test]
    fn single_bar_window_is_rejected() {
        let result = Config::parse_toml("[scheduler]\nbars = 1");
        assert_eq!(invalid_field(result), "scheduler.bars");
    }

    #[test]
    fn http_source_needs_a_base_url() {
        let result = Config::parse_toml("[market_data]\nsource = \"http\"");
        assert_eq!(invalid_field(result), "market_data.base_url");
    }

    #[test]
    fn relay_url_must_parse() {
        let result = Config::parse_toml("[notifications.email]\nrelay_url = \"relay\"");
        assert_eq!(invalid_field(result), "notifications.email.relay_url");
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let result = Config::parse_toml("[logging]\nformat = \"xml\"");
        assert_eq!(invalid_field(result), "logging.format");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let result = Config::parse_toml("[scheduler\ninterval_secs = 1");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.database, "stockwatch.db");
        assert!(matches!(
            Config::load(dir.path().join("absent.toml")),
            Err(Error::Config(ConfigError::ReadFile(_)))
        ));
    }
}
