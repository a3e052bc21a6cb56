use crate::{BackendError, BackendErrorKind, capture::EncoderProfile};

use std::path::Path;

use tracing::debug;

/// A single encoder bound to one output file.
///
/// The owning [`CaptureSession`](crate::CaptureSession) drives it through
/// `start`, `stop` and `release` exactly once each, in that order, skipping
/// steps on failure. `release` must tolerate being the only call made.
pub trait Encoder: Send {
    /// Begin pulling audio from the input source into the output file.
    fn start(&mut self) -> Result<(), BackendError>;

    /// Stop recording and finalize the output file.
    ///
    /// Report [`BackendErrorKind::NoData`] when the stream produced no frames.
    fn stop(&mut self) -> Result<(), BackendError>;

    /// Free the device and any encoder process or thread.
    fn release(&mut self);
}

/// Recording capability plugged into the state machine.
pub trait CaptureBackend: Send {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Allocate a fresh encoder writing `profile`-encoded audio to `output`.
    fn create_encoder(
        &mut self,
        profile: &EncoderProfile,
        output: &Path,
    ) -> Result<Box<dyn Encoder>, BackendError>;
}

/// Backend with no capture at all.
///
/// Every press produces an empty clip; useful on benches and hosts without a
/// microphone.
#[derive(Debug, Default)]
pub struct NoopBackend;

struct NoopEncoder;

impl Encoder for NoopEncoder {
    fn start(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        Err(BackendError::new(
            BackendErrorKind::NoData,
            "no-op backend records nothing",
        ))
    }

    fn release(&mut self) {}
}

impl CaptureBackend for NoopBackend {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn create_encoder(
        &mut self,
        profile: &EncoderProfile,
        output: &Path,
    ) -> Result<Box<dyn Encoder>, BackendError> {
        debug!(%profile, output = ?output, "No-op encoder created");
        Ok(Box::new(NoopEncoder))
    }
}
