//! Error types for the interception engine
//!
//! Every failure in this crate is absorbed locally; nothing here is fatal to
//! the hosting page. The taxonomy exists so that callers can log precisely
//! and pick the right fallback:
//! - Matching failures contribute nothing to a score
//! - Transport failures are dropped, never retried
//! - Guard failures fall back to the least surprising default

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, GuardError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Matching errors (1xx)
    InvalidPattern = 100,

    // Transport errors (2xx)
    TransportFailed = 200,
    TransportUnavailable = 201,
    ChannelFull = 202,

    // Guard errors (3xx)
    HostException = 300,
    MissingGlobal = 301,
    EngineBusy = 302,

    // Configuration errors (4xx)
    ConfigError = 400,
}

/// Where an error sits in the failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Matching,
    Transport,
    Guard,
    Config,
}

/// Main error type for the interception engine
#[derive(Error, Debug, Clone)]
pub enum GuardError {
    // ===== Matching =====
    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    // ===== Transport =====
    #[error("Report delivery failed: {0}")]
    Transport(String),

    #[error("No report transport available")]
    TransportUnavailable,

    #[error("Report channel full ({0} pending)")]
    ChannelFull(usize),

    // ===== Guard =====
    #[error("Host exception: {0}")]
    Host(String),

    #[error("Missing global: {0}")]
    MissingGlobal(String),

    #[error("Engine already borrowed by an in-flight evaluation")]
    EngineBusy,

    // ===== Configuration =====
    #[error("Config error: {0}")]
    Config(String),
}

impl GuardError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            GuardError::InvalidPattern { .. } => ErrorCode::InvalidPattern,
            GuardError::Transport(_) => ErrorCode::TransportFailed,
            GuardError::TransportUnavailable => ErrorCode::TransportUnavailable,
            GuardError::ChannelFull(_) => ErrorCode::ChannelFull,
            GuardError::Host(_) => ErrorCode::HostException,
            GuardError::MissingGlobal(_) => ErrorCode::MissingGlobal,
            GuardError::EngineBusy => ErrorCode::EngineBusy,
            GuardError::Config(_) => ErrorCode::ConfigError,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GuardError::InvalidPattern { .. } => ErrorCategory::Matching,
            GuardError::Transport(_)
            | GuardError::TransportUnavailable
            | GuardError::ChannelFull(_) => ErrorCategory::Transport,
            GuardError::Host(_) | GuardError::MissingGlobal(_) | GuardError::EngineBusy => {
                ErrorCategory::Guard
            }
            GuardError::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether the failed operation is simply dropped.
    ///
    /// Transport failures never roll back a blocking decision and are never
    /// retried.
    pub fn is_dropped(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    pub fn missing(global: &str) -> Self {
        GuardError::MissingGlobal(global.to_string())
    }
}

impl From<GuardError> for JsValue {
    fn from(err: GuardError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<JsValue> for GuardError {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", value));
        GuardError::Host(message)
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::Config(err.to_string())
    }
}

/// Error information for JavaScript consumption
#[derive(Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub is_dropped: bool,
}

impl From<&GuardError> for ErrorInfo {
    fn from(err: &GuardError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            category: err.category(),
            message: err.to_string(),
            is_dropped: err.is_dropped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_dropped() {
        assert!(GuardError::Transport("no listener".into()).is_dropped());
        assert!(GuardError::TransportUnavailable.is_dropped());
        assert!(GuardError::ChannelFull(64).is_dropped());

        assert!(!GuardError::Host("boom".into()).is_dropped());
        assert!(!GuardError::EngineBusy.is_dropped());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GuardError::InvalidPattern {
                pattern: "(".into(),
                message: "unclosed group".into()
            }
            .code(),
            ErrorCode::InvalidPattern
        );
        assert_eq!(GuardError::EngineBusy.code(), ErrorCode::EngineBusy);
        assert_eq!(GuardError::missing("window").code(), ErrorCode::MissingGlobal);
    }

    #[test]
    fn test_categories() {
        assert_eq!(GuardError::Config("bad".into()).category(), ErrorCategory::Config);
        assert_eq!(GuardError::missing("document").category(), ErrorCategory::Guard);
    }

    #[test]
    fn test_error_info() {
        let err = GuardError::ChannelFull(3);
        let info = ErrorInfo::from(&err);
        assert_eq!(info.code, 202);
        assert!(info.is_dropped);
        assert!(info.message.contains("3 pending"));
    }
}
