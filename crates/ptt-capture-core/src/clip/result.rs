use serde::{Deserialize, Serialize};

/// What [`ClipStore::finalize`](crate::ClipStore::finalize) found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    /// Non-empty clip, payload attached.
    Recorded,
    /// File exists but holds no bytes.
    Empty,
    /// No file was produced.
    Missing,
    /// File exists but could not be read.
    Unreadable,
}

/// The outcome of one press, produced once per Up event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipResult {
    /// Radix-64 encoded clip bytes; `None` for empty or unreadable clips.
    pub encoded_payload: Option<String>,
    /// Clip file path.
    pub path: String,
    /// MIME type of the decoded payload.
    pub mime_type: String,
    /// Press duration in milliseconds (Up timestamp minus Down timestamp).
    pub duration_ms: u64,
    /// Size of the clip file in bytes.
    pub size_bytes: u64,
    /// What was found on disk.
    pub status: ClipStatus,
}

impl ClipResult {
    /// True when the press produced usable audio.
    pub fn has_audio(&self) -> bool {
        self.encoded_payload.is_some()
    }
}
