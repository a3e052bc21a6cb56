use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether the push-to-talk key went down or came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPhase {
    /// Key pressed.
    Down,
    /// Key released.
    Up,
}

/// A normalized hardware key signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Pressed or released.
    pub phase: KeyPhase,
    /// The action name the signal arrived under, echoed back outbound.
    pub source_action: String,
    /// Milliseconds since the Unix epoch, on the producer's clock.
    pub timestamp: u64,
    /// Vendor fields carried by the signal (key codes, device ids), echoed
    /// back on the outbound event.
    #[serde(default, flatten)]
    pub extras: Map<String, Value>,
}

impl KeyEvent {
    /// Key-down event.
    pub fn down(source_action: impl Into<String>, timestamp: u64) -> Self {
        Self {
            phase: KeyPhase::Down,
            source_action: source_action.into(),
            timestamp,
            extras: Map::new(),
        }
    }

    /// Key-up event.
    pub fn up(source_action: impl Into<String>, timestamp: u64) -> Self {
        Self {
            phase: KeyPhase::Up,
            source_action: source_action.into(),
            timestamp,
            extras: Map::new(),
        }
    }

    /// Same event carrying `extras`.
    pub fn with_extras(mut self, extras: Map<String, Value>) -> Self {
        self.extras = extras;
        self
    }
}
