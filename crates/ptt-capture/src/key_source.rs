//! Normalized key events read as JSON lines.
//!
//! Each line carries `phase` and optionally `source_action` and `timestamp`.
//! A missing action defaults to `ptt.down`/`ptt.up`, a missing timestamp to
//! the time the line was read. Any other field is kept as a vendor extra and
//! echoed on the outbound event.

use crate::{AppCommand, AppError, AppResult, app::now_millis};

use std::{io::BufRead, panic::Location};

use error_location::ErrorLocation;
use ptt_capture_core::{KeyEvent, KeyPhase};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

/// Action reported for a Down line without one.
pub(crate) const DEFAULT_DOWN_ACTION: &str = "ptt.down";
/// Action reported for an Up line without one.
pub(crate) const DEFAULT_UP_ACTION: &str = "ptt.up";

#[derive(Debug, Deserialize)]
struct WireKeyEvent {
    phase: KeyPhase,
    #[serde(default, alias = "sourceAction")]
    source_action: Option<String>,
    #[serde(default)]
    timestamp: Option<u64>,
    #[serde(default, flatten)]
    extras: Map<String, Value>,
}

/// Parse one inbound line. Blank lines yield `None`.
#[track_caller]
pub(crate) fn parse_line(line: &str) -> AppResult<Option<KeyEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let wire: WireKeyEvent =
        serde_json::from_str(line).map_err(|e| AppError::MalformedKeyEvent {
            reason: format!("{}: {}", e, line),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let source_action = wire.source_action.unwrap_or_else(|| {
        match wire.phase {
            KeyPhase::Down => DEFAULT_DOWN_ACTION,
            KeyPhase::Up => DEFAULT_UP_ACTION,
        }
        .to_string()
    });

    Ok(Some(KeyEvent {
        phase: wire.phase,
        source_action,
        timestamp: wire.timestamp.unwrap_or_else(now_millis),
        extras: wire.extras,
    }))
}

/// Forwards key events from a blocking reader into the app's command channel.
pub struct KeySource<R> {
    reader: R,
}

impl<R: BufRead + Send + 'static> KeySource<R> {
    /// Source reading lines from `reader`.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Start forwarding on a blocking task.
    ///
    /// Sends [`AppCommand::Shutdown`] when the reader reaches end of input.
    /// Stops early once the receiver is dropped.
    pub fn spawn(self, command_tx: mpsc::Sender<AppCommand>) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || {
            for line in self.reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to read key input");
                        break;
                    }
                };

                match parse_line(&line) {
                    Ok(Some(event)) => {
                        debug!(phase = ?event.phase, timestamp = event.timestamp, "Key event received");
                        if command_tx.blocking_send(AppCommand::Key(event)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Skipping malformed key event"),
                }
            }

            info!("Key input closed");
            let _ = command_tx.blocking_send(AppCommand::Shutdown);
        })
    }
}
