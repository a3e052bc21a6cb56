use crate::config::default_log_json;

use serde::{Deserialize, Serialize};

/// Diagnostic output on stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default = "default_log_json")]
    pub json: bool,
}
