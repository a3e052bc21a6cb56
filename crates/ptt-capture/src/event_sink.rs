use crate::AppResult;

use std::io::Write;

use ptt_capture_core::PttEvent;
use tracing::debug;

/// Writes outbound events as JSON lines.
pub struct EventSink<W: Write> {
    writer: W,
}

impl<W: Write> EventSink<W> {
    /// Sink over `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one event as a single line and flush it.
    pub fn emit(&mut self, event: &PttEvent) -> AppResult<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        debug!(original_action = event.original_action(), "Event emitted");

        Ok(())
    }

    /// Recover the writer.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}
