use crate::{
    BackendErrorKind, KeyEvent, PttError, PttEvent, PttState, SAFETY_CEILING_ACTION,
    tests::support::{
        CountingFocus, CountingWakeLock, DOWN_AT, Harness, PTT_DOWN, PTT_UP, ScriptedBackend,
        StopScript, one_second_clip,
    },
};

use std::{
    fs,
    sync::atomic::Ordering,
    time::{Duration, Instant},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, json};

const MAX_SEQUENCE_LEN: usize = 6;
const PRESS_MS: u64 = 1500;

/// WHAT: Every Down/Up sequence up to six events ends idle with nothing held
/// WHY: No ordering of key events may leak a resource or an encoder
#[test]
fn given_any_key_sequence_when_drained_then_idle_with_nothing_held() {
    for len in 0..=MAX_SEQUENCE_LEN {
        for mask in 0u32..(1 << len) {
            // Given: A fresh controller
            let mut harness = Harness::new(ScriptedBackend::writing(one_second_clip()));

            // When: Feeding the sequence encoded by the mask
            for i in 0..len {
                let timestamp = DOWN_AT + i as u64 * 100;
                let event = if mask & (1 << i) == 0 {
                    KeyEvent::down(PTT_DOWN, timestamp)
                } else {
                    KeyEvent::up(PTT_UP, timestamp)
                };
                let result = harness.machine.handle(event);
                assert!(result.is_ok(), "len {} mask {:#b}: {:?}", len, mask, result);

                // Then (each step): at most one encoder, resources match the state
                assert!(harness.counters.max_live() <= 1);
                match harness.machine.state() {
                    PttState::Capturing => assert_eq!(harness.held(), 2),
                    PttState::Idle => assert_eq!(harness.held(), 0),
                }
            }
            harness.machine.shutdown();

            // Then: Idle, nothing held, no live encoder
            assert_eq!(harness.machine.state(), PttState::Idle, "mask {:#b}", mask);
            assert_eq!(harness.held(), 0, "mask {:#b}", mask);
            assert_eq!(harness.machine.held_resources(), 0);
            assert_eq!(harness.counters.live(), 0, "mask {:#b}", mask);
        }
    }
}

/// WHAT: Down immediately followed by Up with no frames yields no payload
/// WHY: A too-short press is benign, not an error
#[test]
#[allow(clippy::unwrap_used, clippy::panic)]
fn given_empty_press_when_released_then_up_without_payload() {
    // Given: A controller over a backend that captures nothing
    let mut harness = Harness::new(ScriptedBackend::empty());
    harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();

    // When: Releasing at the same instant
    let event = harness
        .machine
        .handle(KeyEvent::up(PTT_UP, DOWN_AT))
        .unwrap();

    // Then: Up with no payload, zero duration, idle
    match event {
        Some(PttEvent::KeyUp {
            audio_base64,
            audio_path,
            duration_ms,
            mime_type,
            ..
        }) => {
            assert_eq!(audio_base64, None);
            assert_eq!(audio_path, None);
            assert_eq!(duration_ms, 0);
            assert_eq!(mime_type, "audio/aac");
        }
        other => panic!("expected KeyUp, got {:?}", other),
    }
    assert_eq!(harness.machine.state(), PttState::Idle);
    assert_eq!(harness.held(), 0);
}

/// WHAT: A press spanning over a second yields a decodable payload
/// WHY: Duration comes from key timestamps and the payload from the file
#[test]
#[allow(clippy::unwrap_used, clippy::panic)]
fn given_long_press_when_released_then_payload_and_duration_reported() {
    // Given: A recording controller
    let bytes = one_second_clip();
    let mut harness = Harness::new(ScriptedBackend::writing(bytes.clone()));
    let down = harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();
    assert_eq!(
        down,
        Some(PttEvent::key_down(PTT_DOWN, DOWN_AT, true, Map::new()))
    );

    // When: Releasing after the press
    let event = harness
        .machine
        .handle(KeyEvent::up(PTT_UP, DOWN_AT + PRESS_MS))
        .unwrap();

    // Then: Payload decodes to the clip, duration is the timestamp gap
    let Some(PttEvent::KeyUp {
        original_action,
        audio_base64: Some(payload),
        audio_path: Some(path),
        duration_ms,
        ..
    }) = event
    else {
        panic!("expected KeyUp with payload, got {:?}", event);
    };
    assert_eq!(original_action, PTT_UP);
    assert_eq!(duration_ms, PRESS_MS);
    assert_eq!(STANDARD.decode(payload).unwrap(), bytes);
    assert!(fs::metadata(path).unwrap().len() > 0);
}

/// WHAT: A second Down while capturing is ignored
/// WHY: Nested sessions would alias the encoder
#[test]
#[allow(clippy::unwrap_used)]
fn given_capturing_when_second_down_then_ignored_without_new_session() {
    // Given: A capturing controller
    let mut harness = Harness::new(ScriptedBackend::writing(one_second_clip()));
    harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();

    // When: Another Down arrives
    let event = harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT + 500))
        .unwrap();

    // Then: No event, one encoder, the original start time kept
    assert_eq!(event, None);
    assert_eq!(harness.counters.created(), 1);
    assert_eq!(harness.machine.session_started_at(), Some(DOWN_AT));
    assert_eq!(harness.focus.requests.load(Ordering::SeqCst), 1);
}

/// WHAT: Up without a Down does nothing
/// WHY: Stray releases must not touch resources
#[test]
#[allow(clippy::unwrap_used)]
fn given_idle_when_up_then_no_result_and_no_acquisition() {
    // Given: An idle controller
    let mut harness = Harness::new(ScriptedBackend::writing(one_second_clip()));

    // When: An Up arrives
    let event = harness
        .machine
        .handle(KeyEvent::up(PTT_UP, DOWN_AT))
        .unwrap();

    // Then: Nothing happened
    assert_eq!(event, None);
    assert_eq!(harness.focus.requests.load(Ordering::SeqCst), 0);
    assert_eq!(harness.wake_lock.acquisitions.load(Ordering::SeqCst), 0);
    assert_eq!(harness.counters.created(), 0);
}

/// WHAT: Focus denial still records and closes normally
/// WHY: Audio focus is best-effort
#[test]
#[allow(clippy::unwrap_used)]
fn given_focus_denied_when_pressing_then_recording_completes() {
    // Given: A focus provider that refuses
    let focus = CountingFocus {
        deny: true,
        ..CountingFocus::default()
    };
    let mut harness = Harness::with_providers(
        ScriptedBackend::writing(one_second_clip()),
        focus,
        CountingWakeLock::default(),
        Duration::from_secs(60),
    );

    // When: Pressing and releasing
    let down = harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();
    assert_eq!(harness.machine.held_resources(), 1);
    let up = harness
        .machine
        .handle(KeyEvent::up(PTT_UP, DOWN_AT + PRESS_MS))
        .unwrap();

    // Then: Recorded with payload, nothing held
    assert!(matches!(
        down,
        Some(PttEvent::KeyDown {
            recording: true,
            ..
        })
    ));
    assert!(matches!(
        up,
        Some(PttEvent::KeyUp {
            audio_base64: Some(_),
            ..
        })
    ));
    assert_eq!(harness.held(), 0);
}

/// WHAT: With no resources at all the press still records
/// WHY: Acquire errors are non-fatal to the controller
#[test]
#[allow(clippy::unwrap_used)]
fn given_all_resources_refused_when_pressing_then_recording_completes() {
    // Given: Both providers refuse
    let mut harness = Harness::with_providers(
        ScriptedBackend::writing(one_second_clip()),
        CountingFocus {
            deny: true,
            ..CountingFocus::default()
        },
        CountingWakeLock {
            fail: true,
            ..CountingWakeLock::default()
        },
        Duration::from_secs(60),
    );

    // When: Pressing
    let down = harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();

    // Then: Recording without resources
    assert!(matches!(
        down,
        Some(PttEvent::KeyDown {
            recording: true,
            ..
        })
    ));
    assert_eq!(harness.machine.state(), PttState::Capturing);
    assert_eq!(harness.machine.held_resources(), 0);
}

/// WHAT: A start failure acknowledges the Down with recording=false
/// WHY: The controller stays idle and releases everything it took
#[test]
#[allow(clippy::unwrap_used)]
fn given_busy_device_when_down_then_ack_not_recording_and_idle() {
    // Given: A backend whose encoders cannot start
    let backend = ScriptedBackend {
        start_failure: Some(BackendErrorKind::DeviceBusy),
        ..ScriptedBackend::writing(one_second_clip())
    };
    let mut harness = Harness::new(backend);

    // When: Pressing then releasing
    let down = harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();
    let up = harness
        .machine
        .handle(KeyEvent::up(PTT_UP, DOWN_AT + PRESS_MS))
        .unwrap();

    // Then: Down acked as not recording, Up ignored, nothing held
    assert_eq!(
        down,
        Some(PttEvent::key_down(PTT_DOWN, DOWN_AT, false, Map::new()))
    );
    assert_eq!(up, None);
    assert_eq!(harness.machine.state(), PttState::Idle);
    assert_eq!(harness.held(), 0);
    assert_eq!(harness.counters.live(), 0);
}

/// WHAT: An open failure acknowledges the Down with recording=false
/// WHY: A missing microphone must not wedge the controller
#[test]
#[allow(clippy::unwrap_used)]
fn given_no_device_when_down_then_ack_not_recording_and_resources_released() {
    // Given: A backend with no device
    let backend = ScriptedBackend {
        open_failure: Some(BackendErrorKind::DeviceUnavailable),
        ..ScriptedBackend::empty()
    };
    let mut harness = Harness::new(backend);

    // When: Pressing
    let down = harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();

    // Then: Not recording, nothing held
    assert!(matches!(
        down,
        Some(PttEvent::KeyDown {
            recording: false,
            ..
        })
    ));
    assert_eq!(harness.held(), 0);
    assert_eq!(harness.machine.state(), PttState::Idle);
}

/// WHAT: A fatal stop releases everything before returning the error
/// WHY: A failed session must not leave the device unusable for the next press
#[test]
#[allow(clippy::unwrap_used)]
fn given_stop_fault_when_up_then_error_after_full_teardown() {
    // Given: A capturing controller whose encoder fails on stop
    let backend = ScriptedBackend {
        stop: StopScript::Fail(BackendErrorKind::DiskUnavailable),
        ..ScriptedBackend::empty()
    };
    let mut harness = Harness::new(backend);
    harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();

    // When: Releasing
    let result = harness
        .machine
        .handle(KeyEvent::up(PTT_UP, DOWN_AT + PRESS_MS));

    // Then: Capture error, idle, nothing held, encoder released
    assert!(matches!(result, Err(PttError::Capture { .. })));
    assert_eq!(harness.machine.state(), PttState::Idle);
    assert_eq!(harness.held(), 0);
    assert_eq!(harness.counters.live(), 0);

    // And: The next press works
    let down = harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT + 10_000))
        .unwrap();
    assert!(matches!(
        down,
        Some(PttEvent::KeyDown {
            recording: true,
            ..
        })
    ));
}

/// WHAT: The safety ceiling closes a session left open
/// WHY: A lost key-up must not record forever
#[test]
#[allow(clippy::unwrap_used, clippy::panic)]
fn given_capturing_when_ceiling_passes_then_session_closed_as_up() {
    // Given: A controller with a five second ceiling, capturing
    let mut harness = Harness::with_providers(
        ScriptedBackend::writing(one_second_clip()),
        CountingFocus::default(),
        CountingWakeLock::default(),
        Duration::from_secs(5),
    );
    let mut extras = Map::new();
    extras.insert("deviceId".to_string(), json!("handset-2"));
    let before_down = Instant::now();
    harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT).with_extras(extras))
        .unwrap();
    let deadline = harness.machine.ceiling_deadline().unwrap();
    assert!(deadline >= before_down + Duration::from_secs(5));
    assert!(deadline <= Instant::now() + Duration::from_secs(5));

    // When: Checking just before and at the deadline
    let early = harness
        .machine
        .expire(deadline - Duration::from_millis(1))
        .unwrap();
    let expired = harness.machine.expire(deadline).unwrap();

    // Then: Only the deadline closes it, reported under the ceiling action
    assert_eq!(early, None);
    let Some(PttEvent::KeyUp {
        original_action,
        timestamp,
        duration_ms,
        audio_base64,
        extras,
        ..
    }) = expired
    else {
        panic!("expected KeyUp, got {:?}", expired);
    };
    assert_eq!(original_action, SAFETY_CEILING_ACTION);
    assert_eq!(timestamp, DOWN_AT + 5000);
    assert_eq!(duration_ms, 5000);
    assert_eq!(extras["deviceId"], json!("handset-2"));
    assert!(audio_base64.is_some());
    assert_eq!(harness.machine.state(), PttState::Idle);
    assert_eq!(harness.machine.ceiling_deadline(), None);
    assert_eq!(harness.held(), 0);
}

/// WHAT: A Down stamped long before the host clock is not expired on arrival
/// WHY: The ceiling runs on the host clock, whatever the producer's clock says
#[test]
#[allow(clippy::unwrap_used)]
fn given_down_stamped_in_the_past_when_checking_ceiling_then_still_capturing() {
    // Given: A one minute ceiling and a Down stamped near the epoch
    let mut harness = Harness::with_providers(
        ScriptedBackend::writing(one_second_clip()),
        CountingFocus::default(),
        CountingWakeLock::default(),
        Duration::from_secs(60),
    );
    harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, 1_000))
        .unwrap();

    // When: Checking the ceiling right away
    let expired = harness.machine.expire(Instant::now()).unwrap();

    // Then: The session keeps recording until its Up
    assert_eq!(expired, None);
    assert_eq!(harness.machine.state(), PttState::Capturing);
    let up = harness
        .machine
        .handle(KeyEvent::up(PTT_UP, 1_250))
        .unwrap();
    assert!(matches!(
        up,
        Some(PttEvent::KeyUp {
            duration_ms: 250,
            ..
        })
    ));
}

/// WHAT: Shutdown with a recording in flight tears it down and deletes the clip
/// WHY: Service teardown must release the device and leave no partial clip
#[test]
#[allow(clippy::unwrap_used)]
fn given_capturing_when_shutdown_then_released_and_clip_deleted() {
    // Given: A capturing controller
    let mut harness = Harness::new(ScriptedBackend::writing(one_second_clip()));
    harness
        .machine
        .handle(KeyEvent::down(PTT_DOWN, DOWN_AT))
        .unwrap();

    // When: Shutting down twice
    harness.machine.shutdown();
    harness.machine.shutdown();

    // Then: Idle, nothing held, clip gone
    assert_eq!(harness.machine.state(), PttState::Idle);
    assert_eq!(harness.held(), 0);
    assert_eq!(harness.counters.live(), 0);
    let outputs = harness.counters.outputs();
    assert_eq!(outputs.len(), 1);
    assert!(!outputs[0].exists());
}

/// WHAT: Dropping the controller mid-recording releases everything
/// WHY: Teardown is tied to ownership, not to a remembered call
#[test]
#[allow(clippy::unwrap_used)]
fn given_capturing_when_controller_dropped_then_nothing_held() {
    // Given: A capturing controller
    let Harness {
        mut machine,
        counters,
        focus,
        wake_lock,
        scratch: _scratch,
    } = Harness::new(ScriptedBackend::writing(one_second_clip()));
    machine.handle(KeyEvent::down(PTT_DOWN, DOWN_AT)).unwrap();

    // When: Dropping it
    drop(machine);

    // Then: Released
    assert_eq!(counters.live(), 0);
    assert_eq!(focus.held.load(Ordering::SeqCst), 0);
    assert_eq!(wake_lock.held.load(Ordering::SeqCst), 0);
}
