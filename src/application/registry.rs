//! Monitor registry: lifecycle transitions and trigger bookkeeping over a
//! [`MonitorStore`].
//!
//! Every read-modify-write runs under a per-monitor async lock, so two
//! mutations of the same monitor never interleave while unrelated monitors
//! proceed in parallel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{Monitor, MonitorId, MonitorStatus, OwnerId};
use crate::error::{RegistryError, Result};
use crate::port::outbound::store::MonitorStore;

/// Bookkeeping result of a confirmed trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRecord {
    /// Trigger count after this call.
    pub trigger_count: u64,
    /// False when the bar had already been counted.
    pub counted: bool,
    /// Status after this call. A stopped monitor stays stopped.
    pub status: MonitorStatus,
}

/// Owner of every monitor's lifecycle. Other components read monitors
/// through it and never write to the store directly.
pub struct MonitorRegistry {
    /// Durable records.
    store: Arc<dyn MonitorStore>,
    /// One async lock per monitor id, created on first use.
    locks: DashMap<MonitorId, Arc<Mutex<()>>>,
}

impl MonitorRegistry {
    /// Create a registry over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn MonitorStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: &MonitorId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, id: &MonitorId) -> Result<Monitor> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound { id: id.clone() }.into())
    }

    /// Run `f` against the current record under the monitor's lock and
    /// persist the result. Nothing is written when `f` fails.
    async fn mutate<T: Send>(
        &self,
        id: &MonitorId,
        f: impl FnOnce(&mut Monitor) -> Result<T> + Send,
    ) -> Result<T> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        let mut monitor = self.load(id).await?;
        let value = f(&mut monitor)?;
        self.store.update(&monitor).await?;
        Ok(value)
    }

    /// Persist a new monitor and return its id.
    pub async fn create(&self, monitor: &Monitor) -> Result<MonitorId> {
        self.store.insert(monitor).await?;
        info!(
            monitor_id = %monitor.id(),
            stock_code = %monitor.stock_code(),
            owner = %monitor.owner(),
            conditions = monitor.conditions().len(),
            "Monitor created"
        );
        Ok(monitor.id().clone())
    }

    /// Fetch one monitor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown id.
    pub async fn get(&self, id: &MonitorId) -> Result<Monitor> {
        self.load(id).await
    }

    /// Every monitor, or only `owner`'s, in any status.
    pub async fn list(&self, owner: Option<&OwnerId>) -> Result<Vec<Monitor>> {
        self.store.list(owner).await
    }

    /// Monitors eligible for checks: `active` and `triggered`.
    pub async fn list_active(&self, owner: Option<&OwnerId>) -> Result<Vec<Monitor>> {
        let mut monitors = self.store.list(owner).await?;
        monitors.retain(|m| m.status().is_checkable());
        Ok(monitors)
    }

    /// Apply a status transition and return the previous status.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidTransition` for a transition the
    /// state machine rejects; the record is left unchanged.
    pub async fn set_status(&self, id: &MonitorId, to: MonitorStatus) -> Result<MonitorStatus> {
        let from = self
            .mutate(id, |monitor| {
                monitor.transition(to).map_err(|(from, to)| {
                    RegistryError::InvalidTransition {
                        id: monitor.id().clone(),
                        from,
                        to,
                    }
                    .into()
                })
            })
            .await?;
        if from != to {
            info!(monitor_id = %id, from = %from, to = %to, "Monitor status changed");
        }
        Ok(from)
    }

    /// Count one trigger and return the new count.
    pub async fn increment_trigger(&self, id: &MonitorId) -> Result<u64> {
        self.mutate(id, |monitor| Ok(monitor.increment_trigger(Utc::now())))
            .await
    }

    /// Record a confirmed trigger for the bar at `bar_at`.
    ///
    /// Increments the count, moves `active` to `triggered` and records the
    /// check, all in one write. A bar that already triggered is not counted
    /// again. Monitors stopped while the check was in flight are counted but
    /// stay stopped.
    pub async fn record_trigger(
        &self,
        id: &MonitorId,
        bar_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<TriggerRecord> {
        self.mutate(id, |monitor| {
            monitor.record_check(now, None);
            if monitor.last_trigger_bar_at == Some(bar_at) {
                debug!(monitor_id = %monitor.id(), bar_at = %bar_at, "Bar already counted");
                return Ok(TriggerRecord {
                    trigger_count: monitor.trigger_count(),
                    counted: false,
                    status: monitor.status(),
                });
            }
            let trigger_count = monitor.increment_trigger(now);
            monitor.last_trigger_bar_at = Some(bar_at);
            if monitor.status() == MonitorStatus::Active {
                // Active -> Triggered is always allowed.
                let _ = monitor.transition(MonitorStatus::Triggered);
            }
            Ok(TriggerRecord {
                trigger_count,
                counted: true,
                status: monitor.status(),
            })
        })
        .await
    }

    /// Record a check that did not trigger. `error` is stored as the
    /// monitor's last error; `None` clears it. Status never changes.
    pub async fn record_check(
        &self,
        id: &MonitorId,
        at: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<()> {
        self.mutate(id, |monitor| {
            monitor.record_check(at, error);
            Ok(())
        })
        .await
    }

    /// Remove a monitor entirely.
    pub async fn delete(&self, id: &MonitorId) -> Result<()> {
        let lock = self.lock_for(id);
        let removed = {
            let _guard = lock.lock().await;
            self.store.delete(id).await?
        };
        self.locks.remove(id);
        if !removed {
            return Err(RegistryError::NotFound { id: id.clone() }.into());
        }
        info!(monitor_id = %id, "Monitor deleted");
        Ok(())
    }
}
