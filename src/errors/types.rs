//! Error type definitions for the channel library.
//!
//! A small hierarchy: `AppError` is the top-level type, `SourceError` covers
//! the playlist fetch path, and `StoreError` covers the document store.

use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type AppResult<T> = Result<T, AppError>;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Document store errors
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Playlist fetch and source configuration errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// I/O errors outside the store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while fetching or validating a playlist source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Invalid source configuration (blank path, missing credentials, ...)
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },

    /// Local playlist file does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Fetch deadline exceeded
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// 401/403 from the remote - almost always bad credentials
    #[error("HTTP {status} - check username/password")]
    AuthFailed { status: u16 },

    /// Any other >= 400 status
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Transport-level request failure
    #[error("Request failed: {message}")]
    Request { message: String },

    /// Fetch succeeded but the body was empty
    #[error("Empty response received")]
    EmptyResponse,

    /// Fetch succeeded but no channel entries could be parsed out
    #[error("No channels found in playlist")]
    EmptyPlaylist,
}

impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }
}

impl SourceError {
    /// Create an invalid config error
    pub fn invalid_config<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<U: Into<String>>(url: U) -> Self {
        Self::Timeout { url: url.into() }
    }
}
