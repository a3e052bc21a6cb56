use crate::{
    CaptureBackend, CaptureSession, FfmpegBackend, StopOutcome, VOICE_PROFILE,
    capture::ffmpeg::encoder_args,
};

use std::{path::Path, thread::sleep, time::Duration};

/// WHAT: Encoder arguments describe 16kHz mono AAC in MP4 at 128kbps
/// WHY: The clip format is fixed and consumers rely on it
#[test]
fn given_voice_profile_when_building_encoder_args_then_fixed_format_requested() {
    // Given: The voice profile and an output path
    let output = Path::new("/tmp/ptt_1700000000000.m4a");

    // When: Building the ffmpeg command line
    let args = encoder_args(&VOICE_PROFILE, output);

    // Then: Raw f32 PCM in, AAC/MP4 at the profile's rate out, output last
    let args: Vec<String> = args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let joined = args.join(" ");
    assert!(joined.contains("-f f32le -ar 16000 -ac 1 -i pipe:0"));
    assert!(joined.contains("-c:a aac -b:a 128000"));
    assert!(joined.contains("-f mp4 -y"));
    assert_eq!(
        args.last().map(String::as_str),
        Some("/tmp/ptt_1700000000000.m4a")
    );
}

/// WHAT: The ffmpeg backend records a real clip from the profile's voice source
/// WHY: Validates device selection, resampler and encoder end to end
#[test]
#[allow(clippy::unwrap_used)]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn given_voice_source_when_recording_two_seconds_then_clip_written() {
    // Given: The ffmpeg backend and a scratch directory
    let scratch = tempfile::tempdir().unwrap();
    let mut backend = FfmpegBackend::default();
    assert_eq!(backend.name(), "ffmpeg");

    // When: Recording for two seconds
    let mut session =
        CaptureSession::open(&mut backend, &VOICE_PROFILE, scratch.path(), 1_700_000_000_000)
            .unwrap();
    session.start().unwrap();
    sleep(Duration::from_secs(2));
    let clip = session.stop().unwrap();

    // Then: A non-empty clip exists
    assert_eq!(clip.outcome, StopOutcome::Finished);
    assert!(std::fs::metadata(&clip.path).unwrap().len() > 0);
}
