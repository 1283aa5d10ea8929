//! Outbound adapters (driven side).

pub mod llm;
pub mod market_data;
pub mod memory;
pub mod notifier;
pub mod sqlite;
