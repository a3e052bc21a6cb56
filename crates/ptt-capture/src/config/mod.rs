mod capture_config;
#[allow(clippy::module_inception)]
mod config;
mod logging_config;
mod resource_config;
mod storage_config;

pub(crate) use {
    capture_config::{BackendKind, CaptureConfig},
    config::Config,
    logging_config::LoggingConfig,
    resource_config::ResourceConfig,
    storage_config::StorageConfig,
};

use std::path::PathBuf;

use ptt_capture_core::{DEFAULT_FFMPEG, DEFAULT_WAKE_LOCK_CEILING};

pub(crate) const DEFAULT_AUDIO_FOCUS: bool = true;
pub(crate) const DEFAULT_WAKE_LOCK: bool = true;
pub(crate) const DEFAULT_WAKE_LOCK_CEILING_SECS: u64 = DEFAULT_WAKE_LOCK_CEILING.as_secs();
pub(crate) const MIN_WAKE_LOCK_CEILING_SECS: u64 = 1;
pub(crate) const DEFAULT_INHIBITOR: &str = "systemd-inhibit";
pub(crate) const DEFAULT_LOG_JSON: bool = false;

pub(crate) fn default_audio_focus() -> bool {
    DEFAULT_AUDIO_FOCUS
}

pub(crate) fn default_wake_lock() -> bool {
    DEFAULT_WAKE_LOCK
}

pub(crate) fn default_wake_lock_ceiling_secs() -> u64 {
    DEFAULT_WAKE_LOCK_CEILING_SECS
}

pub(crate) fn default_inhibitor() -> PathBuf {
    PathBuf::from(DEFAULT_INHIBITOR)
}

pub(crate) fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from(DEFAULT_FFMPEG)
}

pub(crate) fn default_log_json() -> bool {
    DEFAULT_LOG_JSON
}
