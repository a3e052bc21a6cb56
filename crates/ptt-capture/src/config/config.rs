//! Configuration management for ptt-capture.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{
        CaptureConfig, DEFAULT_AUDIO_FOCUS, DEFAULT_WAKE_LOCK, DEFAULT_WAKE_LOCK_CEILING_SECS,
        LoggingConfig, ResourceConfig, StorageConfig, default_inhibitor,
    },
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Clip storage.
    pub storage: StorageConfig,
    /// Audio focus and wake lock.
    pub resources: ResourceConfig,
    /// Recorder selection.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let dirs = Self::project_dirs()?;
        let config_dir = dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            let config = Self::default_for(&dirs);
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file.
    #[track_caller]
    #[instrument]
    pub fn load_from(config_path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration loaded");

        Ok(config)
    }

    /// Save configuration using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Defaults rooted in the platform directories of `dirs`.
    pub fn default_for(dirs: &ProjectDirs) -> Self {
        let runtime_dir: PathBuf = dirs
            .runtime_dir()
            .unwrap_or_else(|| dirs.cache_dir())
            .to_path_buf();

        Self {
            storage: StorageConfig {
                scratch_dir: dirs.cache_dir().join("clips"),
            },
            resources: ResourceConfig {
                audio_focus: DEFAULT_AUDIO_FOCUS,
                runtime_dir,
                wake_lock: DEFAULT_WAKE_LOCK,
                inhibitor_program: default_inhibitor(),
                wake_lock_ceiling_secs: DEFAULT_WAKE_LOCK_CEILING_SECS,
            },
            capture: CaptureConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[track_caller]
    pub(crate) fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "ptt-capture", "PTT-Capture").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get project directories".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }
}
