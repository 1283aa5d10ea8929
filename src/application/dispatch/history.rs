//! Bounded per-owner notification history, newest first.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

use crate::domain::{MonitorId, NotificationRecord, OwnerId};

/// Bounded per-owner delivery log, newest first.
pub struct NotificationHistory {
    limit: usize,
    entries: RwLock<HashMap<OwnerId, VecDeque<NotificationRecord>>>,
}

impl NotificationHistory {
    /// Keep at most `limit` records per owner.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record a delivery, dropping the owner's oldest entry past the limit.
    pub fn push(&self, record: NotificationRecord) {
        let mut entries = self.entries.write();
        let queue = entries.entry(record.owner.clone()).or_default();
        queue.push_front(record);
        queue.truncate(self.limit);
    }

    /// Newest first, at most `limit` records.
    #[must_use]
    pub fn list(&self, owner: &OwnerId, limit: usize) -> Vec<NotificationRecord> {
        self.entries
            .read()
            .get(owner)
            .map(|queue| queue.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Remove an owner's history and return how many records were dropped.
    pub fn clear(&self, owner: &OwnerId) -> usize {
        self.entries
            .write()
            .remove(owner)
            .map_or(0, |queue| queue.len())
    }

    /// Drop every record produced by `monitor_id`.
    pub fn forget_monitor(&self, monitor_id: &MonitorId) -> usize {
        let mut removed = 0;
        for queue in self.entries.write().values_mut() {
            let before = queue.len();
            queue.retain(|r| r.message.monitor_id.as_ref() != Some(monitor_id));
            removed += before - queue.len();
        }
        removed
    }

    #[must_use]
    pub fn len(&self, owner: &OwnerId) -> usize {
        self.entries.read().get(owner).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::format::test_message;
    use crate::domain::DeliveryReport;
    use chrono::Utc;

    fn record(owner: &OwnerId, title: &str) -> NotificationRecord {
        let mut message = test_message(Utc::now(), 0);
        message.title = title.to_string();
        NotificationRecord {
            owner: owner.clone(),
            message,
            report: DeliveryReport {
                monitor_id: None,
                owner: owner.clone(),
                channels: Vec::new(),
                dispatched_at: Utc::now(),
            },
        }
    }

    #[test]
    fn newest_first_and_bounded() {
        let owner = OwnerId::from("u");
        let history = NotificationHistory::new(2);
        history.push(record(&owner, "a"));
        history.push(record(&owner, "b"));
        history.push(record(&owner, "c"));

        let titles: Vec<_> = history
            .list(&owner, 10)
            .into_iter()
            .map(|r| r.message.title)
            .collect();
        assert_eq!(titles, vec!["c", "b"]);
        assert_eq!(history.list(&owner, 1).len(), 1);
    }

    #[test]
    fn clear_is_per_owner() {
        let alice = OwnerId::from("alice");
        let bob = OwnerId::from("bob");
        let history = NotificationHistory::new(10);
        history.push(record(&alice, "a"));
        history.push(record(&bob, "b"));

        assert_eq!(history.clear(&alice), 1);
        assert_eq!(history.len(&alice), 0);
        assert_eq!(history.len(&bob), 1);
        assert_eq!(history.clear(&alice), 0);
    }

    #[test]
    fn forget_monitor_drops_only_its_records() {
        let owner = OwnerId::from("u");
        let history = NotificationHistory::new(10);
        let mut tracked = record(&owner, "tracked");
        tracked.message.monitor_id = Some(MonitorId::from("m-1"));
        history.push(tracked);
        history.push(record(&owner, "test"));

        assert_eq!(history.forget_monitor(&MonitorId::from("m-1")), 1);
        assert_eq!(history.list(&owner, 10)[0].message.title, "test");
    }
}
