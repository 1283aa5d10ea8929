//! Domain validation errors for core domain types.
//!
//! These errors are returned by constructors and validators that enforce
//! domain invariants, e.g. a monitor must carry at least one condition.

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Monitors must carry at least one condition.
    #[error("conditions cannot be empty")]
    EmptyConditions,

    /// An indicator parameter is out of range.
    #[error("invalid parameter {name} for {condition}: {reason}")]
    InvalidParameter {
        /// Condition label the parameter belongs to.
        condition: String,
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Stock code must be non-empty.
    #[error("stock code cannot be empty")]
    EmptyStockCode,

    /// A quiet-hours bound could not be parsed as `HH:MM`.
    #[error("invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    /// UTC offset outside +-14h.
    #[error("invalid UTC offset: {0} minutes")]
    InvalidUtcOffset(i32),

    /// Unknown dialect name.
    #[error("unknown script dialect: {0}")]
    UnknownDialect(String),

    /// Unknown monitor status name.
    #[error("unknown monitor status: {0}")]
    UnknownStatus(String),

    /// Unknown bar period name.
    #[error("unknown bar period: {0}")]
    UnknownPeriod(String),

    /// Unknown notification channel name.
    #[error("unknown notification channel: {0}")]
    UnknownChannel(String),
}
