//! SQLite persistence adapters.
//!
//! Monitors and notification settings stored with Diesel ORM over an r2d2
//! pool. Timestamps are RFC 3339 text with fixed microsecond precision so
//! they sort lexically.

pub mod database;
pub mod settings;
pub mod store;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

pub use database::connection::{create_pool, run_migrations, DbPool};
pub use settings::SqliteSettingsStore;
pub use store::SqliteMonitorStore;

pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("timestamp {text:?}: {e}")))
}
