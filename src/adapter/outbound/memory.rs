//! In-memory stores for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Monitor, MonitorId, NotificationSettings, OwnerId};
use crate::error::{RegistryError, Result};
use crate::port::outbound::settings::SettingsProvider;
use crate::port::outbound::store::MonitorStore;

/// Monitor store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryMonitorStore {
    monitors: RwLock<HashMap<MonitorId, Monitor>>,
}

impl MemoryMonitorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MonitorStore for MemoryMonitorStore {
    async fn insert(&self, monitor: &Monitor) -> Result<()> {
        let mut monitors = self.monitors.write();
        if monitors.contains_key(monitor.id()) {
            return Err(RegistryError::AlreadyExists {
                id: monitor.id().clone(),
            }
            .into());
        }
        monitors.insert(monitor.id().clone(), monitor.clone());
        Ok(())
    }

    async fn get(&self, id: &MonitorId) -> Result<Option<Monitor>> {
        Ok(self.monitors.read().get(id).cloned())
    }

    async fn update(&self, monitor: &Monitor) -> Result<()> {
        let mut monitors = self.monitors.write();
        match monitors.get_mut(monitor.id()) {
            Some(slot) => {
                *slot = monitor.clone();
                Ok(())
            }
            None => Err(RegistryError::NotFound {
                id: monitor.id().clone(),
            }
            .into()),
        }
    }

    async fn delete(&self, id: &MonitorId) -> Result<bool> {
        Ok(self.monitors.write().remove(id).is_some())
    }

    async fn list(&self, owner: Option<&OwnerId>) -> Result<Vec<Monitor>> {
        let mut monitors: Vec<Monitor> = self
            .monitors
            .read()
            .values()
            .filter(|m| owner.map_or(true, |o| m.owner() == o))
            .cloned()
            .collect();
        monitors.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(monitors)
    }
}

/// Settings provider backed by a `HashMap`.
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: RwLock<HashMap<OwnerId, NotificationSettings>>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsProvider for MemorySettingsStore {
    async fn get(&self, owner: &OwnerId) -> Result<Option<NotificationSettings>> {
        Ok(self.settings.read().get(owner).cloned())
    }

    async fn put(&self, owner: &OwnerId, settings: &NotificationSettings) -> Result<()> {
        self.settings.write().insert(owner.clone(), settings.clone());
        Ok(())
    }
}
