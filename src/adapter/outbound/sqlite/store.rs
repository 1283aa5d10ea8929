//! SQLite monitor store implementation.
//!
//! Conditions are stored as a JSON array; enums as their lowercase names.

use async_trait::async_trait;
use diesel::prelude::*;

use super::database::connection::DbPool;
use super::database::model::MonitorRow;
use super::database::schema::monitors;
use super::{format_ts, parse_ts};
use crate::domain::{CombineMode, Condition, Monitor, MonitorId, OwnerId};
use crate::error::{Error, RegistryError, Result};
use crate::port::outbound::store::MonitorStore;

/// SQLite-backed monitor store.
pub struct SqliteMonitorStore {
    pool: DbPool,
}

impl SqliteMonitorStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    fn to_row(monitor: &Monitor) -> Result<MonitorRow> {
        Ok(MonitorRow {
            id: monitor.id().to_string(),
            owner: monitor.owner().to_string(),
            stock_code: monitor.stock_code().to_string(),
            stock_name: monitor.stock_name().to_string(),
            intent: monitor.intent().to_string(),
            status: monitor.status().as_str().to_string(),
            conditions_json: serde_json::to_string(monitor.conditions())?,
            combine: monitor.combine().as_str().to_string(),
            script_text: monitor.script_text().to_string(),
            script_dialect: monitor.script_dialect().as_str().to_string(),
            created_at: format_ts(monitor.created_at()),
            last_check_at: monitor.last_check_at().map(format_ts),
            trigger_count: i64::try_from(monitor.trigger_count()).unwrap_or(i64::MAX),
            last_triggered_at: monitor.last_triggered_at().map(format_ts),
            last_trigger_bar_at: monitor.last_trigger_bar_at().map(format_ts),
            last_error: monitor.last_error().map(str::to_string),
        })
    }

    fn from_row(row: MonitorRow) -> Result<Monitor> {
        let conditions: Vec<Condition> = serde_json::from_str(&row.conditions_json)?;
        let combine = match row.combine.as_str() {
            "all" => CombineMode::All,
            "any" => CombineMode::Any,
            other => return Err(Error::Parse(format!("unknown combine mode {other:?}"))),
        };
        let optional_ts = |text: Option<String>| text.as_deref().map(parse_ts).transpose();

        Ok(Monitor {
            id: MonitorId::from(row.id),
            owner: OwnerId::from(row.owner),
            stock_code: row.stock_code,
            stock_name: row.stock_name,
            intent: row.intent,
            status: row.status.parse()?,
            conditions,
            combine,
            script_text: row.script_text,
            script_dialect: row.script_dialect.parse()?,
            created_at: parse_ts(&row.created_at)?,
            last_check_at: optional_ts(row.last_check_at)?,
            trigger_count: u64::try_from(row.trigger_count).unwrap_or_default(),
            last_triggered_at: optional_ts(row.last_triggered_at)?,
            last_trigger_bar_at: optional_ts(row.last_trigger_bar_at)?,
            last_error: row.last_error,
        })
    }
}

#[async_trait]
impl MonitorStore for SqliteMonitorStore {
    async fn insert(&self, monitor: &Monitor) -> Result<()> {
        let row = Self::to_row(monitor)?;
        let mut conn = self.conn()?;

        let exists = monitors::table
            .find(&row.id)
            .select(monitors::id)
            .first::<String>(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?
            .is_some();
        if exists {
            return Err(RegistryError::AlreadyExists {
                id: monitor.id().clone(),
            }
            .into());
        }

        diesel::insert_into(monitors::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: &MonitorId) -> Result<Option<Monitor>> {
        let mut conn = self.conn()?;
        let row: Option<MonitorRow> = monitors::table
            .find(id.as_str())
            .select(MonitorRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(Self::from_row).transpose()
    }

    async fn update(&self, monitor: &Monitor) -> Result<()> {
        let row = Self::to_row(monitor)?;
        let mut conn = self.conn()?;
        let updated = diesel::update(monitors::table.find(&row.id))
            .set(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        if updated == 0 {
            return Err(RegistryError::NotFound {
                id: monitor.id().clone(),
            }
            .into());
        }
        Ok(())
    }

    async fn delete(&self, id: &MonitorId) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(monitors::table.find(id.as_str()))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(deleted > 0)
    }

    async fn list(&self, owner: Option<&OwnerId>) -> Result<Vec<Monitor>> {
        let mut conn = self.conn()?;
        let mut query = monitors::table
            .select(MonitorRow::as_select())
            .order((monitors::created_at.asc(), monitors::id.asc()))
            .into_boxed();
        if let Some(owner) = owner {
            query = query.filter(monitors::owner.eq(owner.as_str()));
        }
        let rows: Vec<MonitorRow> = query
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.into_iter().map(Self::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::{create_pool, run_migrations};
    use crate::domain::MonitorStatus;
    use crate::testkit::bars::day;
    use crate::testkit::domain::monitor;

    fn store() -> (tempfile::TempDir, SqliteMonitorStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(dir.path().join("monitors.db").to_str().unwrap()).unwrap();
        run_migrations(&pool).unwrap();
        (dir, SqliteMonitorStore::new(pool))
    }

    #[tokio::test]
    async fn insert_then_get_preserves_every_field() {
        let (_dir, store) = store();
        let mut m = monitor("600519");
        m.status = MonitorStatus::Triggered;
        m.trigger_count = 3;
        m.last_trigger_bar_at = Some(day(10));
        m.last_error = Some("stale data".into());
        m.combine = CombineMode::Any;

        store.insert(&m).await.unwrap();
        let loaded = store.get(m.id()).await.unwrap().unwrap();
        assert_eq!(loaded.conditions(), m.conditions());
        assert_eq!(loaded.status(), MonitorStatus::Triggered);
        assert_eq!(loaded.trigger_count(), 3);
        assert_eq!(loaded.last_trigger_bar_at(), Some(day(10)));
        assert_eq!(loaded.last_error(), Some("stale data"));
        assert_eq!(loaded.combine(), CombineMode::Any);
    }

    #[tokio::test]
    async fn update_clears_optional_fields() {
        let (_dir, store) = store();
        let mut m = monitor("600519");
        m.last_error = Some("boom".into());
        store.insert(&m).await.unwrap();

        m.last_error = None;
        store.update(&m).await.unwrap();
        assert!(store.get(m.id()).await.unwrap().unwrap().last_error().is_none());
    }

    #[tokio::test]
    async fn missing_rows() {
        let (_dir, store) = store();
        let m = monitor("600519");
        assert!(store.get(m.id()).await.unwrap().is_none());
        assert!(store.update(&m).await.unwrap_err().is_not_found());
        assert!(!store.delete(m.id()).await.unwrap());

        store.insert(&m).await.unwrap();
        assert!(store.insert(&m).await.unwrap_err().is_conflict());
        assert!(store.delete(m.id()).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_oldest_first_and_filters_by_owner() {
        let (_dir, store) = store();
        let mut older = monitor("600519");
        older.created_at = day(1);
        let mut newer = monitor("000001");
        newer.created_at = day(2);
        let mut other = monitor("300750");
        other.owner = OwnerId::from("someone-else");

        store.insert(&newer).await.unwrap();
        store.insert(&older).await.unwrap();
        store.insert(&other).await.unwrap();

        let codes: Vec<_> = store
            .list(Some(older.owner()))
            .await
            .unwrap()
            .iter()
            .map(|m| m.stock_code().to_string())
            .collect();
        assert_eq!(codes, vec!["600519", "000001"]);
        assert_eq!(store.list(None).await.unwrap().len(), 3);
    }
}
