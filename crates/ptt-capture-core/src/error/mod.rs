use crate::capture::CaptureState;

use std::{fmt, panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use thiserror::Error;

/// Classification reported by a capture backend when an encoder operation fails.
///
/// The state machine decides between "empty clip" and a genuine fault from this
/// code alone, never from the human-readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The input device is held by another client.
    DeviceBusy,
    /// No input device or encoder is present.
    DeviceUnavailable,
    /// Microphone permission was revoked or never granted.
    PermissionDenied,
    /// The output location cannot be written.
    DiskUnavailable,
    /// The stream produced zero frames before it was stopped.
    NoData,
    /// The encoder failed while reading, encoding or writing.
    Io,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendErrorKind::DeviceBusy => "device busy",
            BackendErrorKind::DeviceUnavailable => "device unavailable",
            BackendErrorKind::PermissionDenied => "permission denied",
            BackendErrorKind::DiskUnavailable => "disk unavailable",
            BackendErrorKind::NoData => "no data",
            BackendErrorKind::Io => "i/o fault",
        };
        f.write_str(name)
    }
}

/// Error raised by a [`CaptureBackend`](crate::CaptureBackend) or its encoder.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {reason}")]
pub struct BackendError {
    /// Machine-readable failure class.
    pub kind: BackendErrorKind,
    /// Description for logs.
    pub reason: String,
}

impl BackendError {
    /// Build a backend error of the given kind.
    pub fn new(kind: BackendErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// Map an OS error from the encoder or filesystem onto a backend error kind.
    pub fn from_io(source: &std::io::Error, context: &str) -> Self {
        use std::io::ErrorKind;

        let kind = match source.kind() {
            ErrorKind::NotFound => BackendErrorKind::DeviceUnavailable,
            ErrorKind::PermissionDenied => BackendErrorKind::PermissionDenied,
            ErrorKind::ResourceBusy => BackendErrorKind::DeviceBusy,
            ErrorKind::StorageFull | ErrorKind::ReadOnlyFilesystem => {
                BackendErrorKind::DiskUnavailable
            }
            _ => BackendErrorKind::Io,
        };

        Self::new(kind, format!("{}: {}", context, source))
    }
}

/// Audio-focus and wake-lock acquisition errors.
///
/// Never fatal: the session records without the resource.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Another holder owns the exclusive audio focus.
    #[error("Audio focus denied: {reason} {location}")]
    FocusDenied {
        /// Why the grant was refused.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The wake lock could not be taken.
    #[error("Wake lock failed: {reason} {location}")]
    WakeLockFailed {
        /// Why the lock could not be taken.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Capture session lifecycle errors.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The backend could not allocate an encoder or output path.
    #[error("Failed to open capture session: {source} {location}")]
    OpenFailed {
        /// Underlying backend error.
        #[source]
        source: BackendError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The encoder refused to start recording.
    #[error("Failed to start recording: {source} {location}")]
    StartFailed {
        /// Underlying backend error.
        #[source]
        source: BackendError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The encoder failed to stop for a reason other than an empty stream.
    #[error("Failed to stop recording: {source} {location}")]
    StopFailed {
        /// Underlying backend error.
        #[source]
        source: BackendError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An operation was called in a lifecycle state that does not allow it.
    #[error("Invalid capture state: expected {expected}, found {actual:?} {location}")]
    InvalidState {
        /// State the operation requires.
        expected: CaptureState,
        /// State the session was in.
        actual: CaptureState,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Clip file and scratch directory errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The scratch directory could not be created or listed.
    #[error("Scratch directory unavailable at {path:?}: {source} {location}")]
    ScratchDirUnavailable {
        /// Scratch directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A finished clip could not be read.
    #[error("Failed to read clip {path:?}: {source} {location}")]
    ReadFailed {
        /// Clip path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Errors surfaced by the [`PttStateMachine`](crate::PttStateMachine).
///
/// By the time one of these reaches the caller the session has already been
/// torn down and every resource released.
#[derive(Error, Debug)]
pub enum PttError {
    /// The capture session failed in a way that is not an empty clip.
    #[error("Capture session failed: {source} {location}")]
    Capture {
        /// Underlying capture error.
        #[source]
        source: CaptureError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Scratch storage failed.
    #[error("Clip storage failed: {source} {location}")]
    Storage {
        /// Underlying storage error.
        #[source]
        source: StorageError,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

// Manual From impls with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<CaptureError> for PttError {
    #[track_caller]
    fn from(source: CaptureError) -> Self {
        PttError::Capture {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<StorageError> for PttError {
    #[track_caller]
    fn from(source: StorageError) -> Self {
        PttError::Storage {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`PttError`].
pub type Result<T> = std::result::Result<T, PttError>;
