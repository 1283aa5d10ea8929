//! Email notification channel.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{ChannelKind, NotificationMessage, NotificationSettings, OwnerId};
use crate::error::DeliveryFailure;
use crate::port::outbound::notifier::{EmailTransport, NotificationChannel, OutgoingEmail};

/// Sends the email rendering of a message to the owner's address.
pub struct EmailChannel {
    transport: Arc<dyn EmailTransport>,
}

impl EmailChannel {
    /// Render messages and hand them to `transport`.
    pub fn new(transport: Arc<dyn EmailTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn deliver(
        &self,
        owner: &OwnerId,
        message: &NotificationMessage,
        settings: &NotificationSettings,
    ) -> Result<(), DeliveryFailure> {
        // Checked by the dispatcher as well; a channel used directly still
        // needs somewhere to send.
        let to = settings
            .email_address()
            .ok_or_else(|| DeliveryFailure::Rejected("no email address".into()))?;
        let email = OutgoingEmail {
            to: to.to_string(),
            subject: message.email_subject.clone(),
            text: message.email_text.clone(),
            html: message.email_html.clone(),
        };
        self.transport.send(&email).await?;
        debug!(owner = %owner, transport = self.transport.name(), "Email sent");
        Ok(())
    }
}

/// Transport for deployments without an email relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredTransport;

#[async_trait]
impl EmailTransport for UnconfiguredTransport {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn send(&self, _email: &OutgoingEmail) -> Result<(), DeliveryFailure> {
        Err(DeliveryFailure::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::format::test_message;
    use crate::testkit::domain::settings_with_email;
    use crate::testkit::stub::RecordingTransport;
    use chrono::Utc;

    #[tokio::test]
    async fn sends_to_trimmed_address() {
        let transport = Arc::new(RecordingTransport::new());
        let channel = EmailChannel::new(transport.clone());
        let message = test_message(Utc::now(), 0);

        channel
            .deliver(&OwnerId::from("u"), &message, &settings_with_email("  me@example.com "))
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "me@example.com");
        assert_eq!(sent[0].subject, message.email_subject);
        assert!(sent[0].html.contains("<html>"));
    }

    #[tokio::test]
    async fn unconfigured_transport_fails() {
        let channel = EmailChannel::new(Arc::new(UnconfiguredTransport));
        let err = channel
            .deliver(
                &OwnerId::from("u"),
                &test_message(Utc::now(), 0),
                &settings_with_email("me@example.com"),
            )
            .await
            .unwrap_err();
        assert_eq!(err, DeliveryFailure::NotConfigured);
    }
}
