use crate::{
    BackendErrorKind, CaptureError, CaptureSession, CaptureState, StopOutcome, VOICE_PROFILE,
    capture::session::unique_clip_path,
    tests::support::{DOWN_AT, ScriptedBackend, StopScript, one_second_clip},
};

use std::fs;

/// WHAT: A session walks Opening -> Recording -> Closed and releases its encoder
/// WHY: Exactly one encoder per clip, released on the normal path
#[test]
#[allow(clippy::unwrap_used)]
fn given_scripted_backend_when_recording_then_lifecycle_completes_and_encoder_released() {
    // Given: A backend that writes a one second clip
    let scratch = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend::writing(one_second_clip());
    let counters = backend.counters.clone();

    // When: Opening, starting and stopping
    let mut session =
        CaptureSession::open(&mut backend, &VOICE_PROFILE, scratch.path(), DOWN_AT).unwrap();
    assert_eq!(session.state(), CaptureState::Opening);
    session.start().unwrap();
    assert_eq!(session.state(), CaptureState::Recording);
    let clip = session.stop().unwrap();

    // Then: Closed, clip finished, encoder released
    assert_eq!(session.state(), CaptureState::Closed);
    assert_eq!(clip.outcome, StopOutcome::Finished);
    assert_eq!(
        clip.path,
        scratch.path().join(format!("ptt_{}.m4a", DOWN_AT))
    );
    assert!(fs::metadata(&clip.path).unwrap().len() > 0);
    assert_eq!(counters.live(), 0);
}

/// WHAT: A start failure closes the session and releases the encoder
/// WHY: Device busy or revoked permission must not leave the device held
#[test]
#[allow(clippy::unwrap_used)]
fn given_busy_device_when_starting_then_start_failed_and_closed() {
    // Given: A backend whose encoders cannot start
    let scratch = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend {
        start_failure: Some(BackendErrorKind::DeviceBusy),
        ..ScriptedBackend::empty()
    };
    let counters = backend.counters.clone();
    let mut session =
        CaptureSession::open(&mut backend, &VOICE_PROFILE, scratch.path(), DOWN_AT).unwrap();

    // When: Starting
    let result = session.start();

    // Then: StartFailed, closed, nothing live
    assert!(matches!(
        result,
        Err(CaptureError::StartFailed { ref source, .. }) if source.kind == BackendErrorKind::DeviceBusy
    ));
    assert_eq!(session.state(), CaptureState::Closed);
    assert_eq!(counters.live(), 0);
}

/// WHAT: A stop with no frames is an empty clip, not an error
/// WHY: Very short presses are benign
#[test]
#[allow(clippy::unwrap_used)]
fn given_empty_stream_when_stopping_then_empty_clip_outcome() {
    // Given: A recording session over an encoder that sees no frames
    let scratch = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend::empty();
    let mut session =
        CaptureSession::open(&mut backend, &VOICE_PROFILE, scratch.path(), DOWN_AT).unwrap();
    session.start().unwrap();

    // When: Stopping
    let clip = session.stop().unwrap();

    // Then: Empty clip, closed cleanly
    assert_eq!(clip.outcome, StopOutcome::EmptyClip);
    assert_eq!(session.state(), CaptureState::Closed);
}

/// WHAT: Any other stop fault surfaces as StopFailed after release
/// WHY: Only the empty stream is benign; real faults must reach the caller
#[test]
#[allow(clippy::unwrap_used)]
fn given_disk_failure_when_stopping_then_stop_failed_and_encoder_released() {
    // Given: An encoder that fails on stop
    let scratch = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend {
        stop: StopScript::Fail(BackendErrorKind::DiskUnavailable),
        ..ScriptedBackend::empty()
    };
    let counters = backend.counters.clone();
    let mut session =
        CaptureSession::open(&mut backend, &VOICE_PROFILE, scratch.path(), DOWN_AT).unwrap();
    session.start().unwrap();

    // When: Stopping
    let result = session.stop();

    // Then: StopFailed, encoder released
    assert!(matches!(result, Err(CaptureError::StopFailed { .. })));
    assert_eq!(session.state(), CaptureState::Closed);
    assert_eq!(counters.live(), 0);
}

/// WHAT: Stopping a session that never started is rejected
/// WHY: Lifecycle transitions are strictly ordered
#[test]
#[allow(clippy::unwrap_used)]
fn given_opening_session_when_stopping_then_invalid_state() {
    // Given: An opened but not started session
    let scratch = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend::empty();
    let mut session =
        CaptureSession::open(&mut backend, &VOICE_PROFILE, scratch.path(), DOWN_AT).unwrap();

    // When: Stopping
    let result = session.stop();

    // Then: InvalidState naming both states
    assert!(matches!(
        result,
        Err(CaptureError::InvalidState {
            expected: CaptureState::Recording,
            actual: CaptureState::Opening,
            ..
        })
    ));
}

/// WHAT: Dropping an open session releases its encoder
/// WHY: No exit path may leak the encoder
#[test]
#[allow(clippy::unwrap_used)]
fn given_recording_session_when_dropped_then_encoder_released() {
    // Given: A recording session
    let scratch = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend::empty();
    let counters = backend.counters.clone();
    let mut session =
        CaptureSession::open(&mut backend, &VOICE_PROFILE, scratch.path(), DOWN_AT).unwrap();
    session.start().unwrap();
    assert_eq!(counters.live(), 1);

    // When: Dropping it
    drop(session);

    // Then: Released
    assert_eq!(counters.live(), 0);
}

/// WHAT: An open failure allocates nothing
/// WHY: A missing microphone must leave no encoder behind
#[test]
#[allow(clippy::unwrap_used)]
fn given_unavailable_device_when_opening_then_open_failed() {
    // Given: A backend without a device
    let scratch = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend {
        open_failure: Some(BackendErrorKind::DeviceUnavailable),
        ..ScriptedBackend::empty()
    };

    // When: Opening
    let result = CaptureSession::open(&mut backend, &VOICE_PROFILE, scratch.path(), DOWN_AT);

    // Then: OpenFailed
    assert!(matches!(result, Err(CaptureError::OpenFailed { .. })));
    assert_eq!(backend.counters.created(), 0);
}

/// WHAT: Clip names collide-proof with a numeric suffix
/// WHY: Two presses in the same millisecond must not overwrite each other
#[test]
#[allow(clippy::unwrap_used)]
fn given_existing_clip_when_naming_same_timestamp_then_suffix_added() {
    // Given: A clip already named for the timestamp
    let scratch = tempfile::tempdir().unwrap();
    let first = unique_clip_path(scratch.path(), DOWN_AT, "m4a").unwrap();
    fs::write(&first, b"x").unwrap();

    // When: Naming another clip for the same timestamp
    let second = unique_clip_path(scratch.path(), DOWN_AT, "m4a").unwrap();

    // Then: Suffixed
    assert_eq!(first, scratch.path().join(format!("ptt_{}.m4a", DOWN_AT)));
    assert_eq!(second, scratch.path().join(format!("ptt_{}_1.m4a", DOWN_AT)));
}

/// WHAT: The scratch directory is created on demand
/// WHY: A fresh cache directory may not exist yet
#[test]
#[allow(clippy::unwrap_used)]
fn given_missing_scratch_dir_when_naming_clip_then_directory_created() {
    // Given: A path below a directory that does not exist yet
    let scratch = tempfile::tempdir().unwrap();
    let nested = scratch.path().join("cache").join("ptt");

    // When: Naming a clip
    let path = unique_clip_path(&nested, DOWN_AT, "m4a").unwrap();

    // Then: Directory exists, file does not
    assert!(nested.is_dir());
    assert!(!path.exists());
}
