//! Notification delivery configuration.
//!
//! The relay bearer token comes from `STOCKWATCH_EMAIL_RELAY_TOKEN`.

use std::time::Duration;

use serde::Deserialize;

use crate::application::dispatch::DispatchConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationSection {
    /// How long owner settings stay cached. Defaults to the scheduler
    /// interval when absent.
    pub settings_ttl_secs: Option<u64>,
    pub delivery_timeout_secs: u64,
    /// Entries kept per owner in the notification history.
    pub history_limit: usize,
    /// Buffered browser notifications per subscriber.
    pub browser_buffer: usize,
    pub email: EmailSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailSection {
    pub sender: String,
    /// HTTP relay accepting JSON mail requests. Without it every email
    /// delivery fails as not configured.
    pub relay_url: Option<String>,
}

impl Default for NotificationSection {
    fn default() -> Self {
        Self {
            settings_ttl_secs: None,
            delivery_timeout_secs: 10,
            history_limit: 200,
            browser_buffer: 64,
            email: EmailSection::default(),
        }
    }
}

impl Default for EmailSection {
    fn default() -> Self {
        Self {
            sender: "stockwatch@localhost".into(),
            relay_url: None,
        }
    }
}

impl NotificationSection {
    #[must_use]
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    #[must_use]
    pub fn settings_ttl(&self, scheduler_interval: Duration) -> Duration {
        self.settings_ttl_secs
            .map_or(scheduler_interval, Duration::from_secs)
    }

    #[must_use]
    pub fn to_dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            delivery_timeout: self.delivery_timeout(),
            history_limit: self.history_limit,
        }
    }
}
