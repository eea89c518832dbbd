//! Error types for the Notescribe backend
//!
//! This module defines all error types used throughout the service,
//! using `thiserror` for ergonomic error handling. The HTTP layer maps
//! these variants onto coarse status classes (see `http::ApiError`).

use thiserror::Error;

/// Main error type for Notescribe operations
///
/// This enum encompasses all possible errors that can occur during
/// request handling, configuration loading, provider interactions,
/// workspace file operations, and log shipping.
#[derive(Error, Debug)]
pub enum NotescribeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing credentials for the generation provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Invalid input from the caller (empty fields, malformed URLs, bad paths)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-related errors (API calls, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Path validation failed (outside the workspace root)
    #[error("Path validation failed: {0}")]
    PathOutsideWorkspace(String),

    /// Workspace state errors (no root configured, persistence failures)
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Log shipping errors (collector delivery, file sink)
    #[error("Log shipping error: {0}")]
    LogShipping(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Notescribe operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
