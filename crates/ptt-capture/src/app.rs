use crate::{
    AppCommand, AppResult, EventSink,
    config::{BackendKind, Config},
};

use std::{
    future,
    io::Write,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use ptt_capture_core::{
    AudioFocus, CaptureBackend, ClipStore, CoreResult, FfmpegBackend, InhibitorWakeLock,
    KeyEvent, LockFileFocus, NoopBackend, NoopFocus, NoopWakeLock, PttEvent, PttStateMachine,
    ResourceGuard, VOICE_PROFILE, WakeLock,
};
use serde_json::{Map, Value};
use tokio::{signal, sync::mpsc, time};
use tracing::{error, info, instrument, warn};

/// Name the wake lock is registered under.
const INHIBITOR_WHO: &str = "ptt-capture";

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Build the controller described by `config`.
#[track_caller]
#[instrument(skip(config))]
pub(crate) fn build_machine(config: &Config) -> AppResult<PttStateMachine> {
    let backend: Box<dyn CaptureBackend> = match config.capture.backend {
        BackendKind::Ffmpeg => Box::new(FfmpegBackend::new(config.capture.ffmpeg_path.clone())),
        BackendKind::Noop => Box::new(NoopBackend),
    };

    let focus: Box<dyn AudioFocus> = if config.resources.audio_focus {
        let mut focus = LockFileFocus::new(&config.resources.runtime_dir);
        // A lock left by a crashed run would deny focus until removed.
        focus.clear_stale();
        Box::new(focus)
    } else {
        Box::new(NoopFocus::default())
    };

    let wake_lock: Box<dyn WakeLock> = if config.resources.wake_lock {
        Box::new(InhibitorWakeLock::new(
            config.resources.inhibitor_program.clone(),
            INHIBITOR_WHO,
        ))
    } else {
        Box::new(NoopWakeLock::default())
    };

    let guard = ResourceGuard::new(focus, wake_lock, config.resources.ceiling());
    let store = ClipStore::new(config.storage.scratch_dir.clone(), &VOICE_PROFILE);

    Ok(PttStateMachine::new(backend, guard, store)?)
}

/// Sleep until `deadline`, or forever without one.
async fn ceiling_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(time::Instant::from_std(deadline)).await,
        None => future::pending().await,
    }
}

/// Main application state.
///
/// Sole owner of the controller: key events, ceiling expiry and shutdown are
/// applied one at a time from this task.
pub struct App<W: Write> {
    pub(crate) machine: PttStateMachine,
    pub(crate) sink: EventSink<W>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) last_session_at: Option<u64>,
}

impl<W: Write> App<W> {
    /// Wire a controller to its inbound commands and outbound sink.
    pub(crate) fn new(
        machine: PttStateMachine,
        sink: EventSink<W>,
        command_rx: mpsc::Receiver<AppCommand>,
    ) -> Self {
        Self {
            machine,
            sink,
            command_rx,
            last_session_at: None,
        }
    }

    /// Run the main application event loop until input ends or Ctrl-C.
    ///
    /// Clips left by earlier runs are purged on the way in. On the way out
    /// any in-flight session is torn down and every clip older than the last
    /// session is deleted.
    #[instrument(skip(self))]
    pub(crate) async fn run(&mut self) -> AppResult<()> {
        info!("PTT-Capture starting");

        let started_at = now_millis();
        self.purge(started_at);

        let result = self.event_loop().await;

        self.machine.shutdown();
        self.purge(self.last_session_at.unwrap_or(started_at));

        info!("PTT-Capture shut down");

        result
    }

    async fn event_loop(&mut self) -> AppResult<()> {
        let interrupt = signal::ctrl_c();
        tokio::pin!(interrupt);
        let mut interrupt_armed = true;

        loop {
            let ceiling = ceiling_timer(self.machine.ceiling_deadline());

            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(AppCommand::Key(event)) => self.handle_key(event)?,
                    Some(AppCommand::Shutdown) => {
                        info!("Shutdown requested");
                        break;
                    }
                    None => {
                        info!("All channels closed, shutting down");
                        break;
                    }
                },

                () = ceiling => self.expire()?,

                result = &mut interrupt, if interrupt_armed => match result {
                    Ok(()) => {
                        info!("Interrupt received, shutting down");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Ctrl-C handler unavailable");
                        interrupt_armed = false;
                    }
                },
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, event: KeyEvent) -> AppResult<()> {
        let action = event.source_action.clone();
        let timestamp = event.timestamp;
        let extras = event.extras.clone();
        let outcome = self.machine.handle(event);
        self.publish(outcome, action, timestamp, extras)
    }

    fn expire(&mut self) -> AppResult<()> {
        match self.machine.ceiling_event(Instant::now()) {
            Some(up) => {
                warn!(timestamp = up.timestamp, "Safety ceiling reached, closing session");
                self.handle_key(up)
            }
            None => Ok(()),
        }
    }

    /// Emit the controller's answer; a failed session becomes an abort event.
    pub(crate) fn publish(
        &mut self,
        outcome: CoreResult<Option<PttEvent>>,
        original_action: String,
        timestamp: u64,
        extras: Map<String, Value>,
    ) -> AppResult<()> {
        let event = match outcome {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(()),
            Err(e) => {
                error!(error = %e, "Session aborted");
                PttEvent::aborted(original_action, timestamp, e.to_string(), extras)
            }
        };

        if let PttEvent::KeyDown {
            recording: true,
            timestamp,
            ..
        } = &event
        {
            self.last_session_at = Some(*timestamp);
        }

        self.sink.emit(&event)
    }

    fn purge(&self, cutoff_ms: u64) {
        if let Err(e) = self.machine.store().purge_older_than(cutoff_ms) {
            warn!(error = %e, "Failed to purge stale clips");
        }
    }
}
