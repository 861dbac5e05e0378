//! Error types for netsnap
//!
//! Only configuration problems and unopenable sessions are fatal to a host.
//! Everything that goes wrong while dispatching a single test case is turned
//! into a logged per-test failure by the dispatcher.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for netsnap
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("Failed to open session for host '{host}': {reason}")]
    SessionOpen { host: String, reason: String },

    #[error("'{request}' failed on device: {message}")]
    Invocation { request: String, message: String },

    // === Reply Errors ===
    #[error("Malformed reply: {0}")]
    ReplyParse(String),

    // === Filter Errors ===
    #[error("Invalid filter path '{path}': {reason}")]
    FilterPath { path: String, reason: String },

    // === Store Errors ===
    #[error("Snapshot store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Snapshot store lock poisoned for host '{0}'")]
    StoreLockPoisoned(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid test definition '{path}': {error}")]
    TestDefinition { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write snapshot '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a session open error
    pub fn session_open(host: &str, reason: impl Into<String>) -> Self {
        Self::SessionOpen {
            host: host.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invocation error for a command or RPC
    pub fn invocation(request: &str, message: impl Into<String>) -> Self {
        Self::Invocation {
            request: request.to_string(),
            message: message.into(),
        }
    }

    /// Create a filter path error
    pub fn filter_path(path: &str, reason: &str) -> Self {
        Self::FilterPath {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a file write error
    pub fn file_write(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::ReplyParse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::ReplyParse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_message_names_request() {
        let err = Error::invocation("show version", "connection reset");
        assert_eq!(
            err.to_string(),
            "'show version' failed on device: connection reset"
        );
    }

    #[test]
    fn test_filter_path_message() {
        let err = Error::filter_path("a//b", "empty segment");
        assert!(err.to_string().contains("a//b"));
        assert!(err.to_string().contains("empty segment"));
    }
}
