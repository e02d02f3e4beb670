// models/src/errors.rs

use std::io;
pub use thiserror::Error;
use uuid::Error as UuidError;
use anyhow::Error as AnyhowError;
use bcrypt::BcryptError;
use tokio::task::JoinError;

#[cfg(feature = "bincode-errors")]
use bincode::error::{DecodeError, EncodeError};

use crate::medical::AppointmentStatus;

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("Validation error: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Time slot {time} on {date} is no longer available")]
    SlotUnavailable { date: String, time: String },
    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition { from: AppointmentStatus, to: AppointmentStatus },
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Document rendering error: {0}")]
    DocumentError(String),
    #[error("Notification error: {0}")]
    NotificationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("An internal error occurred: {0}")]
    InternalError(String),

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
    #[error("UUID parsing or generation error: {0}")]
    Uuid(#[from] UuidError),
}

impl ClinicError {
    /// Shorthand for a validation failure carrying a single message.
    pub fn invalid(message: impl Into<String>) -> Self {
        ClinicError::Validation(vec![message.into()])
    }

    /// True for failures of a collaborator (store, renderer, mailer, config)
    /// rather than of the caller's input.
    pub fn is_dependency_failure(&self) -> bool {
        !matches!(
            self,
            ClinicError::Validation(_)
                | ClinicError::NotFound(_)
                | ClinicError::SlotUnavailable { .. }
                | ClinicError::InvalidTransition { .. }
                | ClinicError::Conflict(_)
                | ClinicError::AlreadyExists(_)
                | ClinicError::Unauthorized(_)
        )
    }
}

impl From<serde_json::Error> for ClinicError {
    fn from(err: serde_json::Error) -> Self {
        ClinicError::SerializationError(format!("JSON processing error: {}", err))
    }
}

impl From<AnyhowError> for ClinicError {
    fn from(err: AnyhowError) -> Self {
        ClinicError::InternalError(format!("{:#}", err))
    }
}

impl From<BcryptError> for ClinicError {
    fn from(err: BcryptError) -> Self {
        ClinicError::InternalError(format!("Password hashing failed: {}", err))
    }
}

impl From<JoinError> for ClinicError {
    fn from(err: JoinError) -> Self {
        ClinicError::InternalError(format!("Task failed to join: {:?}", err))
    }
}

/// A type alias for a `Result` that returns a `ClinicError` on failure.
pub type ClinicResult<T> = Result<T, ClinicError>;
