//! Error types for restaurant-knowledge.
//!
//! This module defines all error types used throughout the crate. Errors fall
//! into four groups that the HTTP layer maps onto status codes: validation,
//! not-found, revision conflicts, and storage/transport failures.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for restaurant-knowledge operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Request Errors ===
    /// The request was missing required input or carried malformed data.
    #[error("invalid request: {message}")]
    Validation {
        /// Description of what was wrong with the input.
        message: String,
    },

    /// No record with the given id exists in the collection.
    #[error("record not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    // === Storage Errors ===
    /// The stored document changed since it was loaded.
    #[error("revision conflict while saving {target}")]
    Conflict {
        /// Human-readable name of the document that was being written.
        target: String,
    },

    /// Failed to read the collection file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the collection file.
    #[error("failed to write {path}: {source}")]
    FileWrite {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Remote Errors ===
    /// An HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("remote returned {status}: {body}")]
    RemoteStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// Remote file content was not valid base64.
    #[error("invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Remote file content was not valid UTF-8.
    #[error("invalid UTF-8 content: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// Generic I/O failure (sockets, stdout).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for restaurant-knowledge operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new not-found error for a record id.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a new revision conflict error.
    #[must_use]
    pub fn conflict(target: impl Into<String>) -> Self {
        Self::Conflict {
            target: target.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is caused by bad input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error means the record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a stale-revision rejection.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
