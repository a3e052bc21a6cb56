//! Exclusive audio-focus grants.
//!
//! A PTT press asks for transient, exclusive focus tagged for voice
//! communication so that media playback ducks or pauses and telephony keeps
//! priority. Denial is never fatal.

use crate::ResourceError;

use std::{
    fs::{self, OpenOptions},
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// How long the focus is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusGain {
    /// Held for a short, user-bounded interaction.
    Transient,
}

/// What the focus is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioUsage {
    /// Two-way voice traffic.
    VoiceCommunication,
}

/// Kind of audio content that will flow while focus is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Human speech.
    Speech,
}

/// Parameters of a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusRequest {
    /// Requested gain duration.
    pub gain: FocusGain,
    /// Usage tag.
    pub usage: AudioUsage,
    /// Content tag.
    pub content: ContentType,
}

impl FocusRequest {
    /// The only request a PTT press makes.
    pub const VOICE_TRANSIENT: FocusRequest = FocusRequest {
        gain: FocusGain::Transient,
        usage: AudioUsage::VoiceCommunication,
        content: ContentType::Speech,
    };
}

/// Proof of a granted focus request. Consumed when abandoned.
#[derive(Debug, PartialEq, Eq)]
pub struct FocusGrant {
    token: u64,
}

impl FocusGrant {
    /// Wrap a provider-specific token.
    pub fn new(token: u64) -> Self {
        Self { token }
    }

    /// Provider-specific token.
    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Arbiter for the shared audio subsystem.
pub trait AudioFocus: Send {
    /// Ask for focus. Returns a grant or the reason it was refused.
    fn request(&mut self, request: &FocusRequest) -> Result<FocusGrant, ResourceError>;

    /// Give focus back. Abandoning a grant this arbiter no longer tracks is a no-op.
    fn abandon(&mut self, grant: FocusGrant);
}

/// Focus arbiter that always grants and holds nothing.
#[derive(Debug, Default)]
pub struct NoopFocus {
    next_token: u64,
}

impl AudioFocus for NoopFocus {
    fn request(&mut self, _request: &FocusRequest) -> Result<FocusGrant, ResourceError> {
        self.next_token += 1;
        Ok(FocusGrant::new(self.next_token))
    }

    fn abandon(&mut self, _grant: FocusGrant) {}
}

/// File name of the focus lock inside the runtime directory.
pub const FOCUS_LOCK_FILE: &str = "audio-focus.lock";

/// Exclusive focus backed by a lock file that only one holder can create.
///
/// Any process using the same runtime directory competes for the same grant.
#[derive(Debug)]
pub struct LockFileFocus {
    lock_path: PathBuf,
    held: Option<u64>,
    next_token: u64,
}

impl LockFileFocus {
    /// Create an arbiter whose lock file lives in `runtime_dir`.
    pub fn new(runtime_dir: &Path) -> Self {
        Self {
            lock_path: runtime_dir.join(FOCUS_LOCK_FILE),
            held: None,
            next_token: 0,
        }
    }

    /// Path of the lock file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Remove a lock left behind by a process that is no longer running.
    ///
    /// A lock whose recorded holder is still alive, this process included,
    /// is kept.
    #[instrument(skip(self))]
    pub fn clear_stale(&mut self) {
        if self.held.is_some() {
            return;
        }

        let contents = match fs::read_to_string(&self.lock_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(lock_path = ?self.lock_path, error = %e, "Failed to read audio focus lock");
                return;
            }
        };

        if let Some(pid) = holder_pid(&contents).filter(|pid| process_alive(*pid)) {
            info!(pid, lock_path = ?self.lock_path, "Audio focus lock held by a running process, keeping it");
            return;
        }

        match fs::remove_file(&self.lock_path) {
            Ok(()) => info!(lock_path = ?self.lock_path, "Removed stale audio focus lock"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(lock_path = ?self.lock_path, error = %e, "Failed to remove stale audio focus lock"),
        }
    }
}

/// Pid recorded in a lock file's `pid=<n>` field.
fn holder_pid(contents: &str) -> Option<u32> {
    contents
        .split_whitespace()
        .find_map(|field| field.strip_prefix("pid="))?
        .parse()
        .ok()
}

/// Liveness per procfs. Without procfs every other holder counts as gone.
fn process_alive(pid: u32) -> bool {
    pid == std::process::id() || Path::new("/proc").join(pid.to_string()).exists()
}

impl AudioFocus for LockFileFocus {
    #[track_caller]
    fn request(&mut self, request: &FocusRequest) -> Result<FocusGrant, ResourceError> {
        if self.held.is_some() {
            return Err(ResourceError::FocusDenied {
                reason: "focus already granted to the active session".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ResourceError::FocusDenied {
                reason: format!("Failed to create runtime directory: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .map_err(|e| ResourceError::FocusDenied {
                reason: if e.kind() == std::io::ErrorKind::AlreadyExists {
                    format!("focus held by another client ({:?})", self.lock_path)
                } else {
                    format!("Failed to create focus lock: {}", e)
                },
                location: ErrorLocation::from(Location::caller()),
            })?;

        // The pid lets a later start tell a live holder from a crashed one.
        let _ = writeln!(
            file,
            "pid={} gain={:?} usage={:?} content={:?}",
            std::process::id(),
            request.gain,
            request.usage,
            request.content
        );

        self.next_token += 1;
        self.held = Some(self.next_token);
        debug!(lock_path = ?self.lock_path, token = self.next_token, "Audio focus granted");

        Ok(FocusGrant::new(self.next_token))
    }

    fn abandon(&mut self, grant: FocusGrant) {
        if self.held != Some(grant.token()) {
            return;
        }
        self.held = None;
        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!(lock_path = ?self.lock_path, error = %e, "Failed to remove audio focus lock");
        }
        debug!(token = grant.token(), "Audio focus abandoned");
    }
}

impl Drop for LockFileFocus {
    fn drop(&mut self) {
        if let Some(token) = self.held {
            self.abandon(FocusGrant::new(token));
        }
    }
}
