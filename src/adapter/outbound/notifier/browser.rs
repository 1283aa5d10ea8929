//! Browser notification channel.
//!
//! Sessions subscribe to a broadcast stream and show the notifications
//! addressed to their owner. A delivery with no subscribed session fails,
//! the way a page without notification permission would.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::{ChannelKind, MonitorId, NotificationMessage, NotificationSettings, OwnerId};
use crate::error::DeliveryFailure;
use crate::port::outbound::notifier::NotificationChannel;

/// Payload pushed to browser sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserNotification {
    pub owner: OwnerId,
    pub monitor_id: Option<MonitorId>,
    pub title: String,
    pub body: String,
    /// Notifications sharing a tag replace each other on screen.
    pub tag: String,
}

/// In-process push channel. Subscribers receive notifications sent after
/// they subscribe. A receiver that falls behind the buffer sees `Lagged`.
pub struct BrowserChannel {
    tx: broadcast::Sender<BrowserNotification>,
}

impl BrowserChannel {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every notification pushed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BrowserNotification> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl NotificationChannel for BrowserChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Browser
    }

    async fn deliver(
        &self,
        owner: &OwnerId,
        message: &NotificationMessage,
        _settings: &NotificationSettings,
    ) -> Result<(), DeliveryFailure> {
        let tag = message
            .monitor_id
            .as_ref()
            .map_or_else(|| "stockwatch-test".to_string(), |id| format!("monitor-{id}"));
        let notification = BrowserNotification {
            owner: owner.clone(),
            monitor_id: message.monitor_id.clone(),
            title: message.title.clone(),
            body: message.body.clone(),
            tag,
        };
        let receivers = self
            .tx
            .send(notification)
            .map_err(|_| DeliveryFailure::Rejected("no browser session connected".into()))?;
        trace!(owner = %owner, receivers, "Browser notification pushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::format::test_message;
    use chrono::Utc;

    #[tokio::test]
    async fn subscribers_receive_notifications() {
        let channel = BrowserChannel::new(8);
        let mut rx = channel.subscribe();
        let owner = OwnerId::from("u");

        channel
            .deliver(&owner, &test_message(Utc::now(), 0), &NotificationSettings::default())
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.owner, owner);
        assert_eq!(received.title, "🔔 测试通知");
        assert_eq!(received.tag, "stockwatch-test");
    }

    #[tokio::test]
    async fn delivery_without_sessions_fails() {
        let channel = BrowserChannel::new(8);
        let err = channel
            .deliver(
                &OwnerId::from("u"),
                &test_message(Utc::now(), 0),
                &NotificationSettings::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryFailure::Rejected(_)));
    }
}
