mod backend;
mod device;
pub(crate) mod ffmpeg;
mod profile;
pub(crate) mod resampler;
pub(crate) mod session;

pub use {
    backend::{CaptureBackend, Encoder, NoopBackend},
    ffmpeg::{DEFAULT_FFMPEG, FfmpegBackend},
    profile::{Codec, Container, EncoderProfile, InputSource, VOICE_PROFILE},
    session::{CLIP_FILE_PREFIX, CaptureSession, CaptureState, ClipHandle, StopOutcome},
};
