//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the monitor engine's use cases.

pub mod dispatch;
pub mod evaluation;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod settings_cache;
pub mod synthesis;
