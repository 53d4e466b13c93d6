//! Core error types for breathroom-core.
//!
//! The scheduler surface (start/pause/reset/tick) is infallible. Errors
//! only surface at the edges: configuration, technique data and the
//! async session handle.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Technique data failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session actor errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// No technique with the requested id
    #[error("Unknown technique: {0}")]
    TechniqueNotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors for technique data.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors from the async session handle.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// The session task has stopped and no longer accepts commands
    #[error("session is closed")]
    Closed,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for SessionError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        SessionError::Closed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for SessionError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        SessionError::Closed
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
