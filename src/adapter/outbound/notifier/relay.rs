//! Email transport posting JSON to an HTTP mail relay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::error::{DeliveryFailure, Result};
use crate::port::outbound::notifier::{EmailTransport, OutgoingEmail};

/// Environment variable holding the relay's bearer token.
pub const TOKEN_ENV: &str = "STOCKWATCH_EMAIL_RELAY_TOKEN";

#[derive(Debug)]
pub struct HttpEmailRelay {
    client: Client,
    url: Url,
    sender: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

impl HttpEmailRelay {
    /// # Errors
    ///
    /// Returns an error if `url` does not parse or the HTTP client cannot be
    /// built.
    pub fn new(url: &str, sender: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: Url::parse(url)?,
            sender: sender.into(),
            token: None,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attach the token from [`TOKEN_ENV`] when set.
    #[must_use]
    pub fn with_env_token(self) -> Self {
        match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => self.with_token(token.trim()),
            _ => self,
        }
    }
}

#[async_trait]
impl EmailTransport for HttpEmailRelay {
    fn name(&self) -> &'static str {
        "http-relay"
    }

    async fn send(&self, email: &OutgoingEmail) -> std::result::Result<(), DeliveryFailure> {
        let body = RelayRequest {
            from: &self.sender,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
            html: &email.html,
        };
        let mut request = self.client.post(self.url.clone()).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryFailure::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        let detail = format!("{status}: {}", detail.trim());
        if status.is_client_error() {
            Err(DeliveryFailure::Rejected(detail))
        } else {
            Err(DeliveryFailure::Transport(detail))
        }
    }
}
