//! Error types for Switchboard Core

use thiserror::Error;

use crate::limits::ValidationError;

/// Result type alias using the core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
