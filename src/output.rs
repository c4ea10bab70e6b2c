//! JSON Output Envelope Types
//!
//! With `--format json` every command prints exactly one envelope on stdout:
//!
//! - Success: `{"ok": true, "engine": "mysql", "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "engine": "mysql", "command": "...", "error": {"code": "...", "message": "..."}}`

use serde::{Deserialize, Serialize};

use crate::engine::ENGINE_NAME;
use crate::error::SniffError;

/// Success envelope for command results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    pub engine: String,

    /// Command that was executed (sniff, schema, connect)
    pub command: String,

    pub data: T,

    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, engine: ENGINE_NAME.to_string(), command: command.into(), data, meta }
    }
}

/// Error envelope for command failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    pub engine: String,

    pub command: String,

    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    pub fn new(command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, engine: ENGINE_NAME.to_string(), command: command.into(), error }
    }

    pub fn from_error(command: impl Into<String>, err: &SniffError) -> Self {
        Self::new(command, ErrorInfo::from(err))
    }
}

/// Error information structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g. "QUERY_FAILED")
    pub code: String,

    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

impl From<&SniffError> for ErrorInfo {
    fn from(err: &SniffError) -> Self {
        Self::new(err.error_code(), err.message())
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub execution_ms: u64,

    /// Number of check rows produced (reports only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<usize>,
}

impl Metadata {
    #[must_use]
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, checks: None }
    }

    #[must_use]
    pub const fn with_checks(execution_ms: u64, checks: usize) -> Self {
        Self { execution_ms, checks: Some(checks) }
    }
}
