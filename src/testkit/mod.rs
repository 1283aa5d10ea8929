//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`bars`]: OHLCV fixtures with known indicator outcomes.
//! - [`domain`]: builders for monitors, drafts and settings.
//! - [`stub`]: in-memory collaborators: recording and failing channels, a
//!   static market data source with an optional gate, a canned generator.
//! - [`engine`]: a fully wired in-memory engine.

pub mod bars;
pub mod domain;
pub mod engine;
pub mod stub;
