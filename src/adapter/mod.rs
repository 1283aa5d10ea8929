//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`]: drivers of the control surface (CLI).
//! - [`outbound`]: stores, channels, market data and LLM clients.

pub mod inbound;
pub mod outbound;
