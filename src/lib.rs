//! Stockwatch - condition-monitor engine for stock-watching intents.
//!
//! Turns a free-text intent ("notify me when MA5 crosses MA10") into a
//! persistent, independently scheduled monitor that evaluates technical
//! conditions against OHLCV bars and dispatches notifications across
//! channels, honouring quiet hours and never double-counting a trigger.
//!
//! # Architecture
//!
//! ```text
//! intent --> Synthesizer --> MonitorDraft --> MonitorRegistry (pending -> active)
//!                                                   |
//!             OhlcvSource --> Scheduler --(evaluate)-+--> trigger bookkeeping
//!                                 |
//!                                 +--> Dispatcher --> browser / email channels
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Bars, conditions, monitors, evaluation results, settings
//! - [`port`] - Traits for collaborators and the inbound control surface
//! - [`application`] - Synthesis, evaluation, registry, scheduling, dispatch
//! - [`adapter`] - Stores, channels, data sources, LLM client, CLI
//! - [`infrastructure`] - Configuration, logging and runtime wiring
//! - [`error`] - Error types for the crate

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
