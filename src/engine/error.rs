//! Normalized error types for the grid browsing engine
//!
//! Backend-specific errors are mapped to these unified error types so the
//! caller can react to the kind of failure (auth, timeout, ...) without
//! knowing which driver produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all engine operations
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum EngineError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("No active connection")]
    NotConnected,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Query execution error: {message}")]
    ExecutionError { message: String },

    #[error("Query timed out: {message}")]
    Timeout { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: msg.into() }
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError { message: msg.into() }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout { message: msg.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }

    /// True for failures caused by the query running too long.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True for credential/login failures. The caller is expected to force
    /// a disconnect of the shared connection when it sees one of these.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Caller-visible remediation hint, currently only for timeouts.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } => Some(
                "Try a smaller page size or switch foreign-key display to key-only \
                 to drop the joins.",
            ),
            _ => None,
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_carries_remediation_hint() {
        let err = EngineError::timeout("statement timeout");
        assert!(err.is_timeout());
        assert!(err.remediation().is_some());
    }

    #[test]
    fn non_timeout_has_no_remediation() {
        let err = EngineError::execution_error("relation \"nope\" does not exist");
        assert!(!err.is_timeout());
        assert!(err.remediation().is_none());
    }

    #[test]
    fn auth_failures_are_distinguishable() {
        let err = EngineError::auth_failed("password authentication failed");
        assert!(err.is_auth_failure());
        assert!(!EngineError::NotConnected.is_auth_failure());
    }
}
