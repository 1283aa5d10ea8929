//! Persistence port for monitors.

use async_trait::async_trait;

use crate::domain::{Monitor, MonitorId, OwnerId};
use crate::error::Result;

/// Durable monitor storage.
///
/// Every write replaces the whole record in one step, so concurrent readers
/// never observe a partial update. Serializing read-modify-write sequences
/// for one id is the registry's job, not the store's.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Insert a new monitor. Fails with `AlreadyExists` on a duplicate id.
    async fn insert(&self, monitor: &Monitor) -> Result<()>;

    /// Get a monitor by ID.
    async fn get(&self, id: &MonitorId) -> Result<Option<Monitor>>;

    /// Replace an existing monitor. Fails with `NotFound` if it is missing.
    async fn update(&self, monitor: &Monitor) -> Result<()>;

    /// Delete a monitor by ID. Returns whether a record was removed.
    async fn delete(&self, id: &MonitorId) -> Result<bool>;

    /// List monitors, optionally restricted to one owner, oldest first.
    async fn list(&self, owner: Option<&OwnerId>) -> Result<Vec<Monitor>>;
}
