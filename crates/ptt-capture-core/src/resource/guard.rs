use crate::{
    ResourceError,
    resource::{
        AudioFocus, DEFAULT_WAKE_LOCK_CEILING, FocusGrant, FocusRequest, NoopFocus, NoopWakeLock,
        WakeLock, WakeLockHandle,
    },
};

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

/// Ambient resources held for the lifetime of one recording session.
///
/// Both fields are `None` whenever no session is active.
#[derive(Debug, Default)]
pub struct SessionResources {
    /// Exclusive audio-focus grant, if one was obtained.
    pub audio_focus: Option<FocusGrant>,
    /// Wake lock, if one was obtained.
    pub wake_lock: Option<WakeLockHandle>,
}

impl SessionResources {
    /// Number of resources currently held.
    pub fn held_count(&self) -> usize {
        usize::from(self.audio_focus.is_some()) + usize::from(self.wake_lock.is_some())
    }

    /// True when nothing is held.
    pub fn is_empty(&self) -> bool {
        self.held_count() == 0
    }
}

/// Acquires and releases the resources that bracket a recording session.
pub struct ResourceGuard {
    focus: Box<dyn AudioFocus>,
    wake_lock: Box<dyn WakeLock>,
    ceiling: Duration,
}

impl ResourceGuard {
    /// Create a guard over the given providers.
    pub fn new(
        focus: Box<dyn AudioFocus>,
        wake_lock: Box<dyn WakeLock>,
        ceiling: Duration,
    ) -> Self {
        Self {
            focus,
            wake_lock,
            ceiling,
        }
    }

    /// Guard whose providers always grant and hold nothing.
    pub fn noop() -> Self {
        Self::new(
            Box::new(NoopFocus::default()),
            Box::new(NoopWakeLock::default()),
            DEFAULT_WAKE_LOCK_CEILING,
        )
    }

    /// Wake-lock safety ceiling, which also bounds a session.
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Request audio focus and a wake lock.
    ///
    /// Each request is best-effort. A refusal is logged and the session goes
    /// ahead without that resource. `Err` is returned only when neither
    /// resource could be obtained.
    #[instrument(skip(self))]
    pub fn acquire(&mut self) -> Result<SessionResources, ResourceError> {
        let mut resources = SessionResources::default();
        let mut first_error = None;

        match self.focus.request(&FocusRequest::VOICE_TRANSIENT) {
            Ok(grant) => {
                debug!(token = grant.token(), "Audio focus GRANTED");
                resources.audio_focus = Some(grant);
            }
            Err(e) => {
                warn!(error = %e, "Audio focus DENIED, recording without it");
                first_error = Some(e);
            }
        }

        if self.wake_lock.is_held() {
            debug!("Wake lock already held, not acquiring again");
        } else {
            match self.wake_lock.acquire(self.ceiling) {
                Ok(handle) => {
                    debug!(
                        token = handle.token(),
                        ceiling_secs = handle.ceiling().as_secs(),
                        "Wake lock acquired"
                    );
                    resources.wake_lock = Some(handle);
                }
                Err(e) => {
                    warn!(error = %e, "Wake lock unavailable, recording without it");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if resources.is_empty() => Err(e),
            _ => {
                info!(held = resources.held_count(), "Session resources acquired");
                Ok(resources)
            }
        }
    }

    /// Release whatever `resources` holds. Never fails.
    #[instrument(skip(self, resources), fields(held = resources.held_count()))]
    pub fn release(&mut self, resources: SessionResources) {
        let SessionResources {
            audio_focus,
            wake_lock,
        } = resources;

        if let Some(grant) = audio_focus {
            self.focus.abandon(grant);
        }
        if let Some(handle) = wake_lock {
            self.wake_lock.release(handle);
        }

        debug!("Session resources released");
    }
}
