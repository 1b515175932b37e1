//! Core error types for timekeep-core.
//!
//! The hierarchy mirrors the failure taxonomy of the client: local
//! validation, recoverable remote failures, fatal authentication expiry,
//! and configuration problems. Data inconsistencies found during
//! reconciliation are logged and degraded, not raised.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timekeep-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Remote service errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credential provider errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the failure is recoverable by retrying or correcting input.
    /// Authentication expiry is the one failure that escalates to sign-out.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CoreError::Api(ApiError::AuthExpired) | CoreError::Auth(AuthError::NotSignedIn)
        )
    }
}

/// Errors from the remote timer/task service.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network-level failure (DNS, connect, timeout, malformed transfer).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status other than the specially-mapped ones.
    #[error("Service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The server rejected the operation because it conflicts with current
    /// server-side state (e.g. a timer is already active).
    #[error("Conflicting server-side state")]
    Conflict,

    /// The bearer credential was rejected. The local session is invalidated.
    #[error("Authentication expired")]
    AuthExpired,

    /// The response body could not be interpreted.
    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

/// Credential provider errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credential is available (never signed in, or signed out).
    #[error("Not signed in")]
    NotSignedIn,

    /// The underlying credential store failed.
    #[error("Credential store error: {0}")]
    Store(String),
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
}

/// Validation errors, rejected locally before any remote call.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Task name must be non-empty
    #[error("Task name must not be empty")]
    EmptyTaskName,

    /// Referenced task is not present in the store
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
