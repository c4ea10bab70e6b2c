//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout dbsniff.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `ConnectionFailed`: Cannot open or ping the database (fatal to a report)
//! - `QueryFailed`: A diagnostic query failed or a row failed to decode (aborts one group)
//! - `InvalidInput`: Malformed input or missing required parameters
//! - `ReadOnlyViolation`: A statement other than SELECT/SHOW/DESCRIBE was about to be sent
//! - `ConfigError`: Configuration file or profile errors

use thiserror::Error;

/// Main error type for dbsniff operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SniffError {
    /// Database connection or liveness check failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Diagnostic query failed or returned rows that could not be decoded
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Statement rejected before execution because it is not read-only
    #[error("Read-only violation: {0}")]
    ReadOnlyViolation(String),

    /// Configuration error (file not found, invalid JSON, unknown profile)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SniffError {
    /// Convert error to error code string for JSON output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ReadOnlyViolation(_) => "READ_ONLY_VIOLATION",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Get human-readable error message
    ///
    /// Messages never contain the connection password.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether this error must stop the whole report
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::InvalidInput(_) | Self::ConfigError(_))
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a read-only violation error
    pub fn read_only_violation(message: impl Into<String>) -> Self {
        Self::ReadOnlyViolation(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for dbsniff operations
pub type Result<T> = std::result::Result<T, SniffError>;
