//! Delivery ports: notification channels and the email transport behind the
//! email channel.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ChannelKind, NotificationMessage, NotificationSettings, OwnerId};
use crate::error::DeliveryFailure;

/// A fire-and-forget delivery channel.
///
/// Channels are called only after enable flags, quiet hours and the email
/// address check have passed. They report success or a [`DeliveryFailure`]
/// and never panic on transport errors.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn deliver(
        &self,
        owner: &OwnerId,
        message: &NotificationMessage,
        settings: &NotificationSettings,
    ) -> Result<(), DeliveryFailure>;
}

/// One outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Transport used by the email channel.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryFailure>;
}

/// Registry of delivery channels, one per kind.
#[derive(Default, Clone)]
pub struct ChannelRegistry {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel, replacing any existing channel of the same kind.
    pub fn register(&mut self, channel: Arc<dyn NotificationChannel>) {
        let kind = channel.kind();
        self.channels.retain(|c| c.kind() != kind);
        self.channels.push(channel);
    }

    #[must_use]
    pub fn get(&self, kind: ChannelKind) -> Option<&Arc<dyn NotificationChannel>> {
        self.channels.iter().find(|c| c.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn NotificationChannel>> {
        self.channels.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.channels.iter().map(|c| c.kind()))
            .finish()
    }
}
