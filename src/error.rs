//! Error types for athena-mcp.
//!
//! Defines the main error enum used throughout the server. Every failure kind
//! stays distinguishable until the tool dispatch boundary turns it into a
//! single protocol error.

use thiserror::Error;

/// Main error type for athena-mcp operations.
#[derive(Error, Debug)]
pub enum AthenaError {
    /// Missing or invalid tool arguments (absent table name, bad max_keys, etc.)
    #[error("Invalid arguments: {0}")]
    Argument(String),

    /// The AWS CLI or service call failed (spawn failure, auth, throttling, etc.)
    #[error("AWS CLI error: {0}")]
    ExternalCall(String),

    /// The query was still queued or running after every poll attempt.
    #[error("Query execution timeout: {execution_id} still running after {attempts} status checks")]
    Timeout { execution_id: String, attempts: u32 },

    /// The query reached FAILED or CANCELLED.
    #[error("Query failed with status: {status}{}", format_reason(.reason))]
    ExecutionFailed {
        status: String,
        reason: Option<String>,
    },

    /// The requested tool is not registered.
    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    /// Configuration errors (invalid config file, malformed output location, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (serialization failures, unexpected states, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AthenaError {
    /// Creates an argument error with the given message.
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    /// Creates an external call error with the given message.
    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalCall(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Argument(_) => "Argument Error",
            Self::ExternalCall(_) => "AWS Error",
            Self::Timeout { .. } => "Timeout",
            Self::ExecutionFailed { .. } => "Query Failed",
            Self::UnknownOperation(_) => "Unknown Tool",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl From<serde_json::Error> for AthenaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization failed: {e}"))
    }
}

fn format_reason(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(" ({r})"),
        None => String::new(),
    }
}

/// Result type alias using AthenaError.
pub type Result<T> = std::result::Result<T, AthenaError>;
