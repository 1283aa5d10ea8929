//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the collaborators the engine needs: monitor
//! persistence, owner settings, market data, delivery channels, and text
//! generation.

pub mod llm;
pub mod market_data;
pub mod notifier;
pub mod settings;
pub mod store;
pub mod synthesis;
