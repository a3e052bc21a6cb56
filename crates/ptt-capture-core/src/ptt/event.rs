use crate::clip::ClipResult;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire names owned by [`PttEvent`]. Vendor extras using one of them are
/// dropped rather than emitted twice.
const RESERVED_FIELDS: &[&str] = &[
    "type",
    "originalAction",
    "timestamp",
    "recording",
    "audioBase64",
    "audioPath",
    "mimeType",
    "durationMs",
    "reason",
];

/// Outbound notification produced by the state machine.
///
/// Serialized with a `type` tag and camelCase fields. Vendor extras of the
/// triggering key event sit alongside the named fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PttEvent {
    /// A Down was handled.
    #[serde(rename = "ptt.down", rename_all = "camelCase")]
    KeyDown {
        /// Action the Down arrived under.
        original_action: String,
        /// Down timestamp.
        timestamp: u64,
        /// False when the recorder could not be opened or started.
        recording: bool,
        /// Vendor fields of the Down.
        #[serde(flatten)]
        extras: Map<String, Value>,
    },

    /// A recording finished.
    #[serde(rename = "ptt.up", rename_all = "camelCase")]
    KeyUp {
        /// Action the Up arrived under.
        original_action: String,
        /// Up timestamp.
        timestamp: u64,
        /// Radix-64 clip bytes, absent for an empty clip.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_base64: Option<String>,
        /// Clip path, present only alongside `audio_base64`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_path: Option<String>,
        /// MIME type of the decoded payload.
        mime_type: String,
        /// Press duration.
        duration_ms: u64,
        /// Vendor fields of the event that ended the session.
        #[serde(flatten)]
        extras: Map<String, Value>,
    },

    /// A recording failed while stopping and produced no clip.
    #[serde(rename = "ptt.aborted", rename_all = "camelCase")]
    Aborted {
        /// Action of the event that ended the session.
        original_action: String,
        /// Timestamp of the event that ended the session.
        timestamp: u64,
        /// Failure description.
        reason: String,
        /// Vendor fields of the event that ended the session.
        #[serde(flatten)]
        extras: Map<String, Value>,
    },
}

impl PttEvent {
    /// Acknowledgement of a handled Down.
    pub fn key_down(
        original_action: impl Into<String>,
        timestamp: u64,
        recording: bool,
        extras: Map<String, Value>,
    ) -> Self {
        Self::KeyDown {
            original_action: original_action.into(),
            timestamp,
            recording,
            extras: passthrough(extras),
        }
    }

    /// Up notification for a finalized clip.
    pub fn key_up(
        original_action: impl Into<String>,
        timestamp: u64,
        clip: ClipResult,
        extras: Map<String, Value>,
    ) -> Self {
        let audio_path = clip.encoded_payload.as_ref().map(|_| clip.path.clone());
        Self::KeyUp {
            original_action: original_action.into(),
            timestamp,
            audio_base64: clip.encoded_payload,
            audio_path,
            mime_type: clip.mime_type,
            duration_ms: clip.duration_ms,
            extras: passthrough(extras),
        }
    }

    /// Notification for a session that failed and produced no clip.
    pub fn aborted(
        original_action: impl Into<String>,
        timestamp: u64,
        reason: impl Into<String>,
        extras: Map<String, Value>,
    ) -> Self {
        Self::Aborted {
            original_action: original_action.into(),
            timestamp,
            reason: reason.into(),
            extras: passthrough(extras),
        }
    }

    /// Action name echoed by every variant.
    pub fn original_action(&self) -> &str {
        match self {
            Self::KeyDown {
                original_action, ..
            }
            | Self::KeyUp {
                original_action, ..
            }
            | Self::Aborted {
                original_action, ..
            } => original_action,
        }
    }
}

fn passthrough(mut extras: Map<String, Value>) -> Map<String, Value> {
    extras.retain(|key, _| !RESERVED_FIELDS.contains(&key.as_str()));
    extras
}
