//! Error types for device operations

use thiserror::Error;

use crate::models::{Availability, StreamKind};

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Device error types
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The eye-tracking engine cannot be used
    #[error("Eye tracking engine unusable: {0}")]
    Unavailable(Availability),

    /// The device refused to create a sample stream
    #[error("Failed to create {kind} stream: {reason}")]
    StreamCreation { kind: StreamKind, reason: String },

    /// Synthetic sample generator could not start
    #[error("Sample generator error: {0}")]
    Generator(String),
}

impl DeviceError {
    pub fn stream_creation<S: Into<String>>(kind: StreamKind, reason: S) -> Self {
        Self::StreamCreation {
            kind,
            reason: reason.into(),
        }
    }
}
