//! Infrastructure configuration modules.

pub mod llm;
pub mod logging;
pub mod market_data;
pub mod notification;
pub mod scheduler;
pub mod settings;
pub mod synthesis;

pub use settings::Config;
