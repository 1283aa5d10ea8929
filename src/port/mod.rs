//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                 ┌──────────────────────────┐
//!   CLI ────────▶ │ inbound::MonitorControl  │
//!                 └────────────┬─────────────┘
//!                              │ application
//!        ┌───────────────┬─────┴────────┬────────────────┐
//!        ▼               ▼              ▼                ▼
//!  MonitorStore     OhlcvSource   NotificationChannel  ScriptGenerator
//!  SettingsProvider               EmailTransport       Llm
//! ```

pub mod inbound;
pub mod outbound;
