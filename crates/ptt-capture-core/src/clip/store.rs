//! Scratch directory holding clip files.
//!
//! Turns a finished clip into a transferable payload and removes clips that
//! outlived their session.

use crate::{
    StorageError,
    capture::{CLIP_FILE_PREFIX, EncoderProfile},
    clip::{ClipResult, ClipStatus},
};

use std::{
    fs,
    panic::Location,
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};

/// Clip files and their encoding for transport.
#[derive(Debug, Clone)]
pub struct ClipStore {
    dir: PathBuf,
    mime_type: &'static str,
    extension: &'static str,
}

impl ClipStore {
    /// Store clips of `profile` in `dir`.
    pub fn new(dir: impl Into<PathBuf>, profile: &EncoderProfile) -> Self {
        Self {
            dir: dir.into(),
            mime_type: profile.mime_type,
            extension: profile.extension,
        }
    }

    /// Scratch directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the scratch directory if it does not exist.
    #[track_caller]
    pub fn prepare(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::ScratchDirUnavailable {
            path: self.dir.clone(),
            source,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Build the result for a finished clip at `path`.
    ///
    /// Never fails: a missing, empty or unreadable file yields a result with
    /// no payload so the press can still be reported. The file is left in
    /// place.
    #[instrument(skip(self))]
    pub fn finalize(&self, path: &Path, duration_ms: u64) -> ClipResult {
        let mut result = ClipResult {
            encoded_payload: None,
            path: path.to_string_lossy().into_owned(),
            mime_type: self.mime_type.to_string(),
            duration_ms,
            size_bytes: 0,
            status: ClipStatus::Missing,
        };

        match self.read_clip(path) {
            Ok(None) => warn!("No clip file created"),
            Ok(Some(bytes)) if bytes.is_empty() => {
                warn!("Empty clip file, skipping payload");
                result.status = ClipStatus::Empty;
            }
            Ok(Some(bytes)) => {
                result.size_bytes = bytes.len() as u64;
                result.encoded_payload = Some(STANDARD.encode(&bytes));
                result.status = ClipStatus::Recorded;
                info!(size_bytes = result.size_bytes, "Clip processed");
            }
            Err(e) => {
                error!(error = %e, "Failed to read clip, reporting without payload");
                result.status = ClipStatus::Unreadable;
            }
        }

        result
    }

    /// Delete one clip. A file that is already gone is not an error.
    pub fn discard(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = ?path, "Clip discarded"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?path, error = %e, "Failed to discard clip"),
        }
    }

    /// Delete every clip whose session started before `cutoff_ms`.
    ///
    /// Only files named like clips are touched. Returns how many were removed.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn purge_older_than(&self, cutoff_ms: u64) -> Result<usize, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(StorageError::ScratchDirUnavailable {
                    path: self.dir.clone(),
                    source,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Some(started_at) = self.clip_timestamp(&path) else {
                continue;
            };
            if started_at >= cutoff_ms {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = ?path, "Cleaned up stale clip");
                    removed += 1;
                }
                Err(e) => warn!(path = ?path, error = %e, "Failed to remove stale clip"),
            }
        }

        if removed > 0 {
            info!(removed, "Stale clips purged");
        }

        Ok(removed)
    }

    /// Session start encoded in a clip file name (`ptt_<millis>[_<n>].<ext>`).
    pub(crate) fn clip_timestamp(&self, path: &Path) -> Option<u64> {
        if path.extension()? != self.extension {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let rest = stem.strip_prefix(CLIP_FILE_PREFIX)?;
        let millis = rest.split('_').next()?;
        millis.parse().ok()
    }

    #[track_caller]
    fn read_clip(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::ReadFailed {
                path: path.to_path_buf(),
                source,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
