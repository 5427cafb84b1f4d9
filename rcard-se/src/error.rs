//! Error types for rcard-se
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Domain rejections (unknown event types, lock conflicts) are
//! distinct variants so the API layer can map them to precise status codes.

use thiserror::Error;

/// Main error type for the scoring engine
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event type not present in the scoring table
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// Event payload missing or inconsistent required fields
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not permitted in the round's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Lock transition lost to a concurrent writer or a stale snapshot
    #[error("Lock conflict: {0}")]
    LockConflict(String),

    /// Requester is not authorized for the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rcard_common::Error> for Error {
    fn from(err: rcard_common::Error) -> Self {
        match err {
            rcard_common::Error::Io(e) => Error::Io(e),
            rcard_common::Error::Config(msg) => Error::Config(msg),
            rcard_common::Error::NotFound(msg) => Error::NotFound(msg),
            rcard_common::Error::InvalidInput(msg) => Error::BadRequest(msg),
            rcard_common::Error::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
