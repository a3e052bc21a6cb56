use crate::{
    CoreResult, PttError,
    capture::{CaptureBackend, CaptureSession, EncoderProfile, StopOutcome, VOICE_PROFILE},
    clip::ClipStore,
    ptt::{KeyEvent, KeyPhase, PttEvent},
    resource::{ResourceGuard, SessionResources},
};

use std::{fmt, time::Instant};

use tracing::{debug, error, info, instrument, warn};

/// Action reported when the safety ceiling ends a session instead of a key-up.
pub const SAFETY_CEILING_ACTION: &str = "ptt.safety_ceiling";

/// Controller state, as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttState {
    /// No session.
    Idle,
    /// A Down opened a session that is recording.
    Capturing,
}

impl fmt::Display for PttState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything owned by one Down/Up pair.
#[derive(Debug)]
struct ActiveSession {
    down: KeyEvent,
    // Host clock; the Down timestamp is the producer's.
    started: Instant,
    resources: SessionResources,
    capture: CaptureSession,
}

/// Push-to-talk controller.
///
/// Consumes [`KeyEvent`]s, brackets each recording with the ambient resources
/// from its [`ResourceGuard`] and produces one [`PttEvent`] per handled key.
///
/// # Thread Safety
///
/// Every mutating operation takes `&mut self`. Own the machine from a single
/// task and feed it events sequentially; Down and Up handling is then atomic
/// to observers.
///
/// # Teardown
///
/// Dropping the machine runs [`shutdown`](Self::shutdown), so an in-flight
/// recording never outlives its controller.
pub struct PttStateMachine {
    backend: Box<dyn CaptureBackend>,
    guard: ResourceGuard,
    store: ClipStore,
    profile: EncoderProfile,
    active: Option<ActiveSession>,
}

impl PttStateMachine {
    /// Creates an idle controller recording the voice profile through `backend`.
    ///
    /// # Errors
    ///
    /// Returns error if the scratch directory cannot be created.
    #[track_caller]
    #[instrument(skip_all, fields(backend_name = backend.name(), scratch_dir = ?store.dir()))]
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        guard: ResourceGuard,
        store: ClipStore,
    ) -> CoreResult<Self> {
        store.prepare()?;

        info!("PTT controller initialized");

        Ok(Self {
            backend,
            guard,
            store,
            profile: VOICE_PROFILE,
            active: None,
        })
    }

    /// Current state.
    pub fn state(&self) -> PttState {
        if self.active.is_some() {
            PttState::Capturing
        } else {
            PttState::Idle
        }
    }

    /// Clip store the controller finalizes into.
    pub fn store(&self) -> &ClipStore {
        &self.store
    }

    /// Number of ambient resources the active session holds.
    pub fn held_resources(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |session| session.resources.held_count())
    }

    /// Down timestamp of the active session.
    pub fn session_started_at(&self) -> Option<u64> {
        self.active.as_ref().map(|session| session.down.timestamp)
    }

    /// Host instant at which the active session hits the safety ceiling.
    ///
    /// Measured from when the Down was handled, not from its timestamp.
    pub fn ceiling_deadline(&self) -> Option<Instant> {
        self.active
            .as_ref()
            .and_then(|session| session.started.checked_add(self.guard.ceiling()))
    }

    /// Handle one key event.
    ///
    /// Returns the event to publish, or `None` for an ignored key (a Down
    /// while capturing, an Up while idle).
    ///
    /// # Errors
    ///
    /// Returns [`PttError::Capture`] when stopping failed for a reason other
    /// than an empty stream. The session is already torn down and its
    /// resources released.
    #[track_caller]
    #[instrument(skip(self, event), fields(phase = ?event.phase, timestamp = event.timestamp))]
    pub fn handle(&mut self, event: KeyEvent) -> CoreResult<Option<PttEvent>> {
        match event.phase {
            KeyPhase::Down => Ok(self.on_down(event)),
            KeyPhase::Up => self.on_up(event),
        }
    }

    /// The key-up that closes the active session once the safety ceiling
    /// has passed at `now`.
    ///
    /// Reported under [`SAFETY_CEILING_ACTION`] with the Down's extras,
    /// timestamped on the Down's clock plus the host time elapsed since the
    /// Down was handled.
    pub fn ceiling_event(&self, now: Instant) -> Option<KeyEvent> {
        let deadline = self.ceiling_deadline()?;
        let session = self.active.as_ref()?;
        if now < deadline {
            return None;
        }

        let elapsed_ms =
            u64::try_from(now.duration_since(session.started).as_millis()).unwrap_or(u64::MAX);
        Some(
            KeyEvent::up(
                SAFETY_CEILING_ACTION,
                session.down.timestamp.saturating_add(elapsed_ms),
            )
            .with_extras(session.down.extras.clone()),
        )
    }

    /// End the active session if the safety ceiling has passed at `now`.
    ///
    /// The session closes exactly as on the key-up from
    /// [`ceiling_event`](Self::ceiling_event).
    ///
    /// # Errors
    ///
    /// Same as [`handle`](Self::handle) for an Up.
    #[track_caller]
    #[instrument(skip(self, now))]
    pub fn expire(&mut self, now: Instant) -> CoreResult<Option<PttEvent>> {
        match self.ceiling_event(now) {
            Some(up) => {
                warn!(timestamp = up.timestamp, "Safety ceiling reached, closing session");
                self.on_up(up)
            }
            None => Ok(None),
        }
    }

    /// Tear down any active session and delete its clip.
    ///
    /// Leaves the controller idle with nothing held. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) {
        let Some(ActiveSession {
            resources,
            mut capture,
            ..
        }) = self.active.take()
        else {
            return;
        };

        if let Err(e) = capture.stop() {
            warn!(error = %e, "Failed to stop recording during shutdown");
        }
        self.guard.release(resources);
        self.store.discard(capture.output_path());

        info!(session_id = %capture.id(), "In-flight session torn down");
    }

    fn on_down(&mut self, event: KeyEvent) -> Option<PttEvent> {
        if let Some(active) = &self.active {
            debug!(
                session_id = %active.capture.id(),
                "Down while capturing, ignoring"
            );
            return None;
        }

        let resources = match self.guard.acquire() {
            Ok(resources) => resources,
            Err(e) => {
                warn!(error = %e, "No session resources, recording anyway");
                SessionResources::default()
            }
        };

        let opened = CaptureSession::open(
            self.backend.as_mut(),
            &self.profile,
            self.store.dir(),
            event.timestamp,
        )
        .and_then(|mut capture| capture.start().map(|()| capture));

        let recording = match opened {
            Ok(capture) => {
                info!(session_id = %capture.id(), "PTT session started");
                self.active = Some(ActiveSession {
                    down: event.clone(),
                    started: Instant::now(),
                    resources,
                    capture,
                });
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to start recording");
                self.guard.release(resources);
                false
            }
        };

        Some(PttEvent::key_down(
            event.source_action,
            event.timestamp,
            recording,
            event.extras,
        ))
    }

    #[track_caller]
    fn on_up(&mut self, event: KeyEvent) -> CoreResult<Option<PttEvent>> {
        let Some(ActiveSession {
            down,
            resources,
            mut capture,
            ..
        }) = self.active.take()
        else {
            debug!("Up while idle, ignoring");
            return Ok(None);
        };

        let stopped = capture.stop();
        // Resources go only after the encoder has stopped.
        self.guard.release(resources);

        let handle = match stopped {
            Ok(handle) => handle,
            Err(e) => {
                error!(session_id = %capture.id(), error = %e, "Recording failed on stop");
                self.store.discard(capture.output_path());
                return Err(PttError::from(e));
            }
        };

        let duration_ms = event.timestamp.saturating_sub(down.timestamp);
        let clip = self.store.finalize(&handle.path, duration_ms);

        info!(
            session_id = %capture.id(),
            duration_ms,
            size_bytes = clip.size_bytes,
            empty = handle.outcome == StopOutcome::EmptyClip,
            "PTT session finished"
        );

        Ok(Some(PttEvent::key_up(
            event.source_action,
            event.timestamp,
            clip,
            event.extras,
        )))
    }
}

impl Drop for PttStateMachine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for PttStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PttStateMachine")
            .field("backend", &self.backend.name())
            .field("store", &self.store)
            .field("profile", &self.profile)
            .field("active", &self.active)
            .finish()
    }
}
