use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::id::MonitorId;
use crate::domain::monitor::MonitorStatus;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors raised while turning an intent into conditions and a script.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// No known indicator keyword or pattern in the intent. Recoverable by
    /// rephrasing.
    #[error("no monitoring condition recognised in intent: {intent}")]
    IntentUnrecognized { intent: String },

    /// The generative backend returned output that failed validation.
    #[error("generated script is invalid: {0}")]
    InvalidGeneratedScript(String),
}

/// Monitor registry errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("monitor not found: {id}")]
    NotFound { id: MonitorId },

    #[error("invalid transition for monitor {id}: {from} -> {to}")]
    InvalidTransition {
        id: MonitorId,
        from: MonitorStatus,
        to: MonitorStatus,
    },

    #[error("monitor {id} is {status} and cannot be checked")]
    NotCheckable { id: MonitorId, status: MonitorStatus },

    #[error("monitor already exists: {id}")]
    AlreadyExists { id: MonitorId },
}

/// Bad market data handed to the evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("OHLCV series is empty")]
    EmptySeries,

    #[error("timestamps go backwards at bar {index}: {previous} -> {current}")]
    NonMonotonic {
        index: usize,
        previous: chrono::DateTime<chrono::Utc>,
        current: chrono::DateTime<chrono::Utc>,
    },

    #[error("bar {index} has an invalid {field}")]
    InvalidBar { index: usize, field: &'static str },

    #[error("{condition} needs {required} bars, got {available}")]
    InsufficientData {
        condition: String,
        required: usize,
        available: usize,
    },
}

/// Per-channel delivery failure. Never unwinds trigger bookkeeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    #[error("transport not configured")]
    NotConfigured,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected by transport: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Delivery(#[from] DeliveryFailure),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// True for state conflicts the caller should surface as a 409-style error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::Registry(
                RegistryError::InvalidTransition { .. }
                    | RegistryError::NotCheckable { .. }
                    | RegistryError::AlreadyExists { .. }
            )
        )
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Registry(RegistryError::NotFound { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_are_conflicts() {
        let err = Error::from(RegistryError::InvalidTransition {
            id: MonitorId::from("m-1"),
            from: MonitorStatus::Stopped,
            to: MonitorStatus::Active,
        });
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "invalid transition for monitor m-1: stopped -> active"
        );
    }

    #[test]
    fn unknown_monitor_is_not_found() {
        let err = Error::from(RegistryError::NotFound {
            id: MonitorId::from("m-2"),
        });
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn synthesis_errors_are_neither() {
        let err = Error::from(SynthesisError::IntentUnrecognized {
            intent: "帮我分析一下".into(),
        });
        assert!(!err.is_conflict() && !err.is_not_found());
    }
}
