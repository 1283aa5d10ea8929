//! Read-through cache of per-owner notification settings.
//!
//! Settings are read on every dispatch, so entries are kept for a short TTL.
//! Writes go through to the provider and replace the cached entry.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{NotificationSettings, OwnerId};
use crate::error::Result;
use crate::port::outbound::settings::SettingsProvider;

/// Read-through TTL cache of notification settings.
pub struct SettingsCache {
    provider: Arc<dyn SettingsProvider>,
    ttl: Duration,
    entries: DashMap<OwnerId, (Instant, NotificationSettings)>,
}

impl SettingsCache {
    /// Entries older than `ttl` are reloaded from `provider`.
    pub fn new(provider: Arc<dyn SettingsProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Settings for `owner`, or the defaults when none are stored.
    pub async fn get(&self, owner: &OwnerId) -> Result<NotificationSettings> {
        if let Some(entry) = self.entries.get(owner) {
            let (stored_at, settings) = entry.value();
            if stored_at.elapsed() < self.ttl {
                return Ok(settings.clone());
            }
        }

        let settings = self.provider.get(owner).await?.unwrap_or_default();
        debug!(owner = %owner, "Notification settings loaded");
        self.entries
            .insert(owner.clone(), (Instant::now(), settings.clone()));
        Ok(settings)
    }

    /// Validate and store settings for `owner`.
    ///
    /// # Errors
    ///
    /// Returns a domain error for invalid settings; nothing is written.
    pub async fn put(&self, owner: &OwnerId, settings: NotificationSettings) -> Result<()> {
        settings.validate()?;
        self.provider.put(owner, &settings).await?;
        self.entries.insert(owner.clone(), (Instant::now(), settings));
        Ok(())
    }

    /// Drop `owner`'s entry so the next read hits the provider.
    pub fn invalidate(&self, owner: &OwnerId) {
        self.entries.remove(owner);
    }
}
