//! CPU wake locks with a hard hold ceiling.

use crate::ResourceError;

use std::{
    panic::Location,
    path::PathBuf,
    process::{Child, Command, Stdio},
    time::Duration,
};

use error_location::ErrorLocation;
use tracing::{debug, instrument, warn};

/// Upper bound on how long a wake lock may be held.
///
/// Guarantees release if the Up event is lost.
pub const DEFAULT_WAKE_LOCK_CEILING: Duration = Duration::from_secs(30 * 60);

/// Proof of a held wake lock. Consumed when released.
#[derive(Debug, PartialEq, Eq)]
pub struct WakeLockHandle {
    token: u64,
    ceiling: Duration,
}

impl WakeLockHandle {
    /// Wrap a provider-specific token.
    pub fn new(token: u64, ceiling: Duration) -> Self {
        Self { token, ceiling }
    }

    /// Provider-specific token.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Maximum hold time the lock was taken with.
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }
}

/// Keeps the processor awake while a clip is being recorded.
pub trait WakeLock: Send {
    /// Take the lock for at most `ceiling`.
    fn acquire(&mut self, ceiling: Duration) -> Result<WakeLockHandle, ResourceError>;

    /// Drop the lock. Releasing a handle that is no longer held is a no-op.
    fn release(&mut self, handle: WakeLockHandle);

    /// Whether a lock is currently in force.
    fn is_held(&mut self) -> bool;
}

/// Wake lock that holds nothing.
#[derive(Debug, Default)]
pub struct NoopWakeLock {
    next_token: u64,
}

impl WakeLock for NoopWakeLock {
    fn acquire(&mut self, ceiling: Duration) -> Result<WakeLockHandle, ResourceError> {
        self.next_token += 1;
        Ok(WakeLockHandle::new(self.next_token, ceiling))
    }

    fn release(&mut self, _handle: WakeLockHandle) {}

    fn is_held(&mut self) -> bool {
        false
    }
}

/// Wake lock held by a `systemd-inhibit` child process.
///
/// The inhibitor wraps `sleep <ceiling>`, so the lock lapses on its own once
/// the ceiling passes even if this process never releases it.
#[derive(Debug)]
pub struct InhibitorWakeLock {
    program: PathBuf,
    who: String,
    child: Option<(u64, Child)>,
    next_token: u64,
}

impl InhibitorWakeLock {
    /// Create a wake lock that runs `program` (normally `systemd-inhibit`).
    pub fn new(program: impl Into<PathBuf>, who: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            who: who.into(),
            child: None,
            next_token: 0,
        }
    }

    fn stop_child(&mut self) {
        if let Some((token, mut child)) = self.child.take() {
            if let Err(e) = child.kill() {
                // Already exited once the ceiling passed.
                debug!(token, error = %e, "Inhibitor already gone");
            }
            let _ = child.wait();
            debug!(token, "Wake lock released");
        }
    }
}

impl WakeLock for InhibitorWakeLock {
    #[track_caller]
    #[instrument(skip(self))]
    fn acquire(&mut self, ceiling: Duration) -> Result<WakeLockHandle, ResourceError> {
        if self.is_held() {
            return Err(ResourceError::WakeLockFailed {
                reason: "wake lock already held".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let child = Command::new(&self.program)
            .arg("--what=sleep:idle")
            .arg(format!("--who={}", self.who))
            .arg("--why=Push-to-talk recording")
            .arg("--mode=block")
            .arg("sleep")
            .arg(ceiling.as_secs().max(1).to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ResourceError::WakeLockFailed {
                reason: format!("Failed to spawn {:?}: {}", self.program, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.next_token += 1;
        self.child = Some((self.next_token, child));
        debug!(
            token = self.next_token,
            ceiling_secs = ceiling.as_secs(),
            "Wake lock acquired"
        );

        Ok(WakeLockHandle::new(self.next_token, ceiling))
    }

    fn release(&mut self, handle: WakeLockHandle) {
        match &self.child {
            Some((token, _)) if *token == handle.token() => self.stop_child(),
            _ => debug!(token = handle.token(), "Wake lock handle not held, ignoring"),
        }
    }

    fn is_held(&mut self) -> bool {
        let exited = match &mut self.child {
            Some((_, child)) => match child.try_wait() {
                Ok(Some(_)) => true,
                Ok(None) => false,
                Err(e) => {
                    warn!(error = %e, "Failed to poll inhibitor process");
                    false
                }
            },
            None => return false,
        };

        if exited {
            self.child = None;
        }
        !exited
    }
}

impl Drop for InhibitorWakeLock {
    fn drop(&mut self) {
        self.stop_child();
    }
}
