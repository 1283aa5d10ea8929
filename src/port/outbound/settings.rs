//! Notification settings port.

use async_trait::async_trait;

use crate::domain::{NotificationSettings, OwnerId};
use crate::error::Result;

/// Source of per-owner notification settings.
///
/// Settings are owned by the surrounding application. The engine only reads
/// them, except through the pass-through control call.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Stored settings, or `None` when the owner never saved any.
    async fn get(&self, owner: &OwnerId) -> Result<Option<NotificationSettings>>;

    async fn put(&self, owner: &OwnerId, settings: &NotificationSettings) -> Result<()>;
}
