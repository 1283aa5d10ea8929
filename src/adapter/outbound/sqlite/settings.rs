//! SQLite settings provider. Each owner's settings are one JSON document.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use super::database::connection::DbPool;
use super::database::model::SettingsRow;
use super::database::schema::notification_settings;
use super::format_ts;
use crate::domain::{NotificationSettings, OwnerId};
use crate::error::{Error, Result};
use crate::port::outbound::settings::SettingsProvider;

/// Per-owner notification settings in the `notification_settings` table.
pub struct SqliteSettingsStore {
    pool: DbPool,
}

impl SqliteSettingsStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsProvider for SqliteSettingsStore {
    async fn get(&self, owner: &OwnerId) -> Result<Option<NotificationSettings>> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;
        let row: Option<SettingsRow> = notification_settings::table
            .find(owner.as_str())
            .select(SettingsRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(|r| serde_json::from_str(&r.settings_json).map_err(Error::from))
            .transpose()
    }

    async fn put(&self, owner: &OwnerId, settings: &NotificationSettings) -> Result<()> {
        let row = SettingsRow {
            owner: owner.to_string(),
            settings_json: serde_json::to_string(settings)?,
            updated_at: format_ts(Utc::now()),
        };
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;
        diesel::replace_into(notification_settings::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}
