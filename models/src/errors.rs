// models/src/errors.rs

use std::io;

use serde::Serialize;
pub use thiserror::Error;

#[cfg(feature = "bincode-errors")]
use bincode::error::{DecodeError, EncodeError};

/// A single field-level constraint violation, carried back to the form
/// that submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("{0} with id {1} was not found")]
    NotFound(&'static str, u64),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("the record was modified or removed by another request")]
    Conflict,
    #[error("{entity} {id} is still referenced by existing appointments")]
    Referenced { entity: &'static str, id: u64 },
    #[error("submitted id does not match the requested record")]
    IdentityMismatch,
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[cfg(feature = "sled-errors")]
    #[error(transparent)]
    Sled(#[from] sled::Error),
    #[cfg(feature = "bincode-errors")]
    #[error(transparent)]
    BincodeDecode(#[from] DecodeError),
    #[cfg(feature = "bincode-errors")]
    #[error(transparent)]
    BincodeEncode(#[from] EncodeError),
}

impl ClinicError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ClinicError::Validation(vec![FieldError::new(field, message)])
    }
}

/// A type alias for a `Result` that returns a `ClinicError` on failure.
pub type ClinicResult<T> = Result<T, ClinicError>;
