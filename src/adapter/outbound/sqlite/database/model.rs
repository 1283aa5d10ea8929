//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{monitors, notification_settings};

/// Database row for a monitor.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = monitors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct MonitorRow {
    pub id: String,
    pub owner: String,
    pub stock_code: String,
    pub stock_name: String,
    pub intent: String,
    pub status: String,
    pub conditions_json: String,
    pub combine: String,
    pub script_text: String,
    pub script_dialect: String,
    pub created_at: String,
    pub last_check_at: Option<String>,
    pub trigger_count: i64,
    pub last_triggered_at: Option<String>,
    pub last_trigger_bar_at: Option<String>,
    pub last_error: Option<String>,
}

/// Database row for an owner's notification settings.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = notification_settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SettingsRow {
    pub owner: String,
    pub settings_json: String,
    pub updated_at: String,
}
