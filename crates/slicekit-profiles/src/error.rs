//! Error types for the profile store.
//!
//! This module provides structured error types for profile lookup,
//! persistence, and validation.

use slicekit_core::SliceError;
use std::io;
use thiserror::Error;

/// Errors that can occur during profile operations.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The requested profile was not found.
    #[error("Profile not found: {category}/{name}")]
    NotFound { category: String, name: String },

    /// The category is not one of printers, presets, filaments.
    #[error("Invalid or missing category: {0}")]
    InvalidCategory(String),

    /// The profile name is empty or contains forbidden characters.
    #[error("Invalid profile name: {0}")]
    InvalidName(String),

    /// The uploaded document is not valid JSON.
    #[error("Invalid profile document: {0}")]
    InvalidDocument(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<ProfileError> for SliceError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound { .. }
            | ProfileError::InvalidCategory(_)
            | ProfileError::InvalidName(_)
            | ProfileError::InvalidDocument(_) => SliceError::validation(err.to_string()),
            ProfileError::IoError(e) => SliceError::resource("read profile", e),
            ProfileError::SerializationError(e) => SliceError::resource("read profile", e),
        }
    }
}

/// Result type alias for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;
