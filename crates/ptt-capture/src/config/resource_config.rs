use crate::config::{
    MIN_WAKE_LOCK_CEILING_SECS, default_audio_focus, default_inhibitor, default_wake_lock,
    default_wake_lock_ceiling_secs,
};

use serde::{Deserialize, Serialize};

use std::{path::PathBuf, time::Duration};

/// Ambient resources held while recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Claim exclusive audio focus through a lock file.
    #[serde(default = "default_audio_focus")]
    pub audio_focus: bool,
    /// Directory holding the focus lock file.
    ///
    /// Every client sharing it competes for the same focus. A lock left by a
    /// process that is no longer running is cleared at startup.
    pub runtime_dir: PathBuf,
    /// Hold a sleep inhibitor while recording.
    #[serde(default = "default_wake_lock")]
    pub wake_lock: bool,
    /// Inhibitor binary.
    #[serde(default = "default_inhibitor")]
    pub inhibitor_program: PathBuf,
    /// Longest a wake lock, and therefore a session, may be held.
    /// Values below one second are raised to one second.
    #[serde(default = "default_wake_lock_ceiling_secs")]
    pub wake_lock_ceiling_secs: u64,
}

impl ResourceConfig {
    /// Safety ceiling as a duration, never shorter than one second.
    pub fn ceiling(&self) -> Duration {
        Duration::from_secs(self.wake_lock_ceiling_secs.max(MIN_WAKE_LOCK_CEILING_SECS))
    }
}
