use ptt_capture_core::{PttError, StorageError};

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Application-level errors for the ptt-capture binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum AppError {
    /// Controller error from ptt-capture-core.
    #[error("PTT error: {source} {location}")]
    Ptt {
        /// The underlying controller error.
        #[source]
        source: PttError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Scratch storage error from ptt-capture-core.
    #[error("Storage error: {source} {location}")]
    Storage {
        /// The underlying storage error.
        #[source]
        source: StorageError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// An inbound line was not a key event.
    #[error("Malformed key event: {reason} {location}")]
    MalformedKeyEvent {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// An outbound event could not be written.
    #[error("Failed to emit event: {source} {location}")]
    EmitFailed {
        /// The underlying serialization or write error.
        #[source]
        source: serde_json::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading or saving error.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

// Manual From impls with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<PttError> for AppError {
    #[track_caller]
    fn from(source: PttError) -> Self {
        AppError::Ptt {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<StorageError> for AppError {
    #[track_caller]
    fn from(source: StorageError) -> Self {
        AppError::Storage {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    #[track_caller]
    fn from(source: serde_json::Error) -> Self {
        AppError::EmitFailed {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `AppError`.
pub type Result<T> = StdResult<T, AppError>;
