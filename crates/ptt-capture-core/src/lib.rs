//! PTT Capture Core Library
//!
//! Push-to-talk capture controller: turns key-down/key-up signals into voice
//! clips while holding audio focus and a wake lock for exactly as long as the
//! key is held.
//!
//! # Example
//!
//! ```no_run
//! use ptt_capture_core::{
//!     ClipStore, CoreResult, FfmpegBackend, KeyEvent, PttStateMachine, ResourceGuard,
//!     VOICE_PROFILE,
//! };
//!
//! use std::{env, thread::sleep, time::Duration};
//!
//! fn main() -> CoreResult<()> {
//!     let store = ClipStore::new(env::temp_dir().join("ptt"), &VOICE_PROFILE);
//!     let mut machine = PttStateMachine::new(
//!         Box::new(FfmpegBackend::default()),
//!         ResourceGuard::noop(),
//!         store,
//!     )?;
//!
//!     machine.handle(KeyEvent::down("ptt.down", 1_700_000_000_000))?;
//!     sleep(Duration::from_secs(3));
//!     if let Some(event) = machine.handle(KeyEvent::up("ptt.up", 1_700_000_003_000))? {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

mod capture;
mod clip;
mod error;
mod ptt;
mod resource;

pub use {
    capture::{
        CLIP_FILE_PREFIX, CaptureBackend, CaptureSession, CaptureState, ClipHandle, Codec,
        Container, DEFAULT_FFMPEG, Encoder, EncoderProfile, FfmpegBackend, InputSource,
        NoopBackend, StopOutcome, VOICE_PROFILE,
    },
    clip::{ClipResult, ClipStatus, ClipStore},
    error::{
        BackendError, BackendErrorKind, CaptureError, PttError, ResourceError,
        Result as CoreResult, StorageError,
    },
    ptt::{KeyEvent, KeyPhase, PttEvent, PttState, PttStateMachine, SAFETY_CEILING_ACTION},
    resource::{
        AudioFocus, AudioUsage, ContentType, DEFAULT_WAKE_LOCK_CEILING, FOCUS_LOCK_FILE,
        FocusGain, FocusGrant, FocusRequest, InhibitorWakeLock, LockFileFocus, NoopFocus,
        NoopWakeLock, ResourceGuard, SessionResources, WakeLock, WakeLockHandle,
    },
};
