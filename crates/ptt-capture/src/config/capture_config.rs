use crate::config::default_ffmpeg_path;

use serde::{Deserialize, Serialize};

use std::path::PathBuf;

/// Which recorder drives the microphone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Default microphone encoded by ffmpeg.
    #[default]
    Ffmpeg,
    /// No capture; every press yields an empty clip.
    Noop,
}

/// Capture backend selection. The encoder profile itself is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Recorder to use.
    #[serde(default)]
    pub backend: BackendKind,
    /// ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}
