//! Common error types used throughout seqport.
//!
//! This module provides a unified error type for identifier parsing,
//! store access, and filesystem failures shared by every crate.

/// Common error type for seqport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A case identifier or directory name did not match the expected pattern.
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// The requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A status store operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new MalformedIdentifier error.
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedIdentifier(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
