//! One clip's encoder lifecycle.
//!
//! `Idle → Opening → Recording → Stopping → Closed`. A session owns exactly
//! one encoder and releases it on every exit path, including drop.

use crate::{
    BackendError, BackendErrorKind, CaptureError,
    capture::{CaptureBackend, Encoder, EncoderProfile},
};

use std::{
    fmt, fs,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Prefix shared by every clip file name.
pub const CLIP_FILE_PREFIX: &str = "ptt_";

/// Lifecycle state of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No encoder allocated.
    Idle,
    /// Encoder allocated, not yet recording.
    Opening,
    /// Encoder is writing the clip.
    Recording,
    /// Encoder is finalizing the clip.
    Stopping,
    /// Encoder released. Terminal.
    Closed,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a recording ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The encoder finalized a clip with audio in it.
    Finished,
    /// The stream produced no frames (very short press).
    EmptyClip,
}

/// Where a stopped session left its clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipHandle {
    /// Clip file path. The file may be absent for an empty clip.
    pub path: PathBuf,
    /// How the recording ended.
    pub outcome: StopOutcome,
}

/// Owns one encoder and one output path for exactly one clip.
pub struct CaptureSession {
    id: Uuid,
    state: CaptureState,
    output_path: PathBuf,
    started_at: u64,
    encoder: Option<Box<dyn Encoder>>,
}

impl CaptureSession {
    /// Allocate a fresh encoder writing to a new, uniquely named file in `output_dir`.
    ///
    /// `started_at` is the Down timestamp in milliseconds and names the file.
    #[track_caller]
    #[instrument(skip(backend, profile), fields(backend_name = backend.name()))]
    pub fn open(
        backend: &mut dyn CaptureBackend,
        profile: &EncoderProfile,
        output_dir: &Path,
        started_at: u64,
    ) -> Result<Self, CaptureError> {
        let output_path = unique_clip_path(output_dir, started_at, profile.extension).map_err(
            |source| CaptureError::OpenFailed {
                source,
                location: ErrorLocation::from(Location::caller()),
            },
        )?;

        let encoder = backend
            .create_encoder(profile, &output_path)
            .map_err(|source| CaptureError::OpenFailed {
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let id = Uuid::new_v4();
        debug!(session_id = %id, output_path = ?output_path, %profile, "Capture session opened");

        Ok(Self {
            id,
            state: CaptureState::Opening,
            output_path,
            started_at,
            encoder: Some(encoder),
        })
    }

    /// Session identifier for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Path the clip is written to.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Down timestamp the session was opened for.
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Begin recording.
    ///
    /// On failure the encoder is released and the session is `Closed`.
    #[track_caller]
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.expect_state(CaptureState::Opening)?;

        let result = match self.encoder.as_mut() {
            Some(encoder) => encoder.start(),
            None => Err(BackendError::new(
                BackendErrorKind::DeviceUnavailable,
                "encoder already released",
            )),
        };

        match result {
            Ok(()) => {
                self.state = CaptureState::Recording;
                info!(output_path = ?self.output_path, "Recording started");
                Ok(())
            }
            Err(source) => {
                self.close();
                Err(CaptureError::StartFailed {
                    source,
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    /// Stop recording and close the session.
    ///
    /// An empty stream is reported as [`StopOutcome::EmptyClip`], not an error.
    #[track_caller]
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn stop(&mut self) -> Result<ClipHandle, CaptureError> {
        self.expect_state(CaptureState::Recording)?;
        self.state = CaptureState::Stopping;

        let result = match self.encoder.as_mut() {
            Some(encoder) => encoder.stop(),
            None => Err(BackendError::new(
                BackendErrorKind::Io,
                "encoder released while recording",
            )),
        };

        self.close();

        match result {
            Ok(()) => {
                info!(output_path = ?self.output_path, "Recording stopped");
                Ok(ClipHandle {
                    path: self.output_path.clone(),
                    outcome: StopOutcome::Finished,
                })
            }
            Err(e) if e.kind == BackendErrorKind::NoData => {
                warn!(reason = %e.reason, "Stop produced no data, treating as empty clip");
                Ok(ClipHandle {
                    path: self.output_path.clone(),
                    outcome: StopOutcome::EmptyClip,
                })
            }
            Err(source) => Err(CaptureError::StopFailed {
                source,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Release the encoder. Safe to call in any state, any number of times.
    pub fn close(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            encoder.release();
            debug!(session_id = %self.id, "Encoder released");
        }
        self.state = CaptureState::Closed;
    }

    #[track_caller]
    fn expect_state(&self, expected: CaptureState) -> Result<(), CaptureError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CaptureError::InvalidState {
                expected,
                actual: self.state,
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("output_path", &self.output_path)
            .field("started_at", &self.started_at)
            .field("encoder", &self.encoder.is_some())
            .finish()
    }
}

/// Pick `ptt_<millis>.<ext>` in `dir`, adding `_<n>` until the name is unused.
pub(crate) fn unique_clip_path(
    dir: &Path,
    timestamp: u64,
    extension: &str,
) -> Result<PathBuf, BackendError> {
    fs::create_dir_all(dir)
        .map_err(|e| BackendError::from_io(&e, "Failed to create scratch directory"))?;

    let mut candidate = dir.join(format!("{}{}.{}", CLIP_FILE_PREFIX, timestamp, extension));
    let mut n = 1u32;
    while candidate.exists() {
        candidate = dir.join(format!(
            "{}{}_{}.{}",
            CLIP_FILE_PREFIX, timestamp, n, extension
        ));
        n += 1;
    }

    Ok(candidate)
}
