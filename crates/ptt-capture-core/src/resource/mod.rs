mod focus;
mod guard;
mod wake_lock;

pub use {
    focus::{
        AudioFocus, AudioUsage, ContentType, FOCUS_LOCK_FILE, FocusGain, FocusGrant, FocusRequest,
        LockFileFocus, NoopFocus,
    },
    guard::{ResourceGuard, SessionResources},
    wake_lock::{
        DEFAULT_WAKE_LOCK_CEILING, InhibitorWakeLock, NoopWakeLock, WakeLock, WakeLockHandle,
    },
};
