//! Notification channel adapters.
//!
//! - [`BrowserChannel`]: fan-out to connected browser sessions.
//! - [`EmailChannel`]: builds the outgoing mail and hands it to an
//!   [`EmailTransport`](crate::port::outbound::notifier::EmailTransport).
//! - [`HttpEmailRelay`]: transport posting mail to an HTTP relay.
//! - [`UnconfiguredTransport`]: transport used when no relay is set.

pub mod browser;
pub mod email;
pub mod relay;

pub use browser::{BrowserChannel, BrowserNotification};
pub use email::{EmailChannel, UnconfiguredTransport};
pub use relay::HttpEmailRelay;
