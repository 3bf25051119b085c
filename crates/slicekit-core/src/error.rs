//! Error handling for SliceKit
//!
//! Errors are grouped by where a slicing job can fail:
//! - Configuration errors (server-side setup, e.g. no engine path)
//! - Validation errors (caller-supplied settings)
//! - Resource errors (workspace filesystem operations)
//! - Engine failures (non-zero exit, timeout, or no artifacts)
//! - Packaging errors (archive creation)
//!
//! Metadata extraction never produces an error here; it degrades to zero.

use crate::data::ExportFormat;
use thiserror::Error;

/// Why the external engine did not produce a usable result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineFailure {
    /// The engine left a diagnostic report with a message
    #[error("Slicing failed with error from slicer: {message}")]
    Reported {
        /// Message from the report's `error_string` field.
        message: String,
        /// Process exit code, if the process exited normally.
        exit_code: Option<i32>,
    },

    /// Non-zero exit without a usable diagnostic report
    #[error("Failed to slice the model ({status}): {output}")]
    Unstructured {
        /// Human-readable exit status.
        status: String,
        /// Process exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Captured stderr, falling back to stdout.
        output: String,
    },

    /// The engine ran past its deadline and was killed
    #[error("Slicer timed out after {timeout_ms}ms")]
    TimedOut {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The engine process could not be started
    #[error("Failed to start slicer: {reason}")]
    Spawn {
        /// The reason the process failed to start.
        reason: String,
    },
}

/// Main error type for a slicing job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SliceError {
    /// A required server-side setting is missing
    #[error("Slicing is not configured properly on the server: {reason}")]
    Configuration {
        /// What is missing or wrong.
        reason: String,
    },

    /// Caller-supplied settings are malformed or reference unknown profiles
    #[error("Invalid slicing settings: {reason}")]
    Validation {
        /// Why the settings were rejected.
        reason: String,
    },

    /// Workspace filesystem operation failed
    #[error("Failed to {operation}: {reason}")]
    Resource {
        /// The operation that failed.
        operation: String,
        /// The underlying I/O error message.
        reason: String,
    },

    /// The engine run failed
    #[error(transparent)]
    Engine(#[from] EngineFailure),

    /// The engine succeeded but nothing matched the requested format
    #[error("No {format} files generated during slicing")]
    NoArtifacts {
        /// The export format that was requested.
        format: ExportFormat,
    },

    /// Building the result archive failed
    #[error("Error creating archive: {reason}")]
    Packaging {
        /// The reason archive creation failed.
        reason: String,
    },
}

impl SliceError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn resource(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Resource {
            operation: operation.into(),
            reason: err.to_string(),
        }
    }

    pub fn packaging(err: impl std::fmt::Display) -> Self {
        Self::Packaging {
            reason: err.to_string(),
        }
    }

    /// Check if the caller is at fault (as opposed to the server or engine)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this is an engine failure, including "no artifacts"
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::NoArtifacts { .. })
    }

    /// Check if the engine was killed on timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Engine(EngineFailure::TimedOut { .. }))
    }
}

/// Result type using SliceError
pub type Result<T> = std::result::Result<T, SliceError>;
