//! Microphone capture encoded by an external `ffmpeg` process.
//!
//! The default input device is mixed down to mono, resampled to the profile
//! rate and streamed as raw little-endian `f32` PCM into ffmpeg's stdin,
//! which muxes AAC into an MP4 file at the session's output path.

use crate::{
    BackendError, BackendErrorKind,
    capture::{
        CaptureBackend, Codec, Container, Encoder, EncoderProfile,
        device::{self, InputDevice},
        resampler::Resampler,
    },
};

use std::{
    ffi::OsString,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{self, Receiver},
    },
    thread::{self, JoinHandle},
};

use cpal::Stream;
use tracing::{debug, info, instrument, warn};

/// Encoder binary looked up on `PATH` when none is configured.
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Callback blocks buffered between the audio thread and the encoder pipe.
const PCM_QUEUE_DEPTH: usize = 256;

/// Capture backend pairing the default microphone with an ffmpeg encoder.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    program: PathBuf,
}

impl FfmpegBackend {
    /// Use the ffmpeg binary at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

impl CaptureBackend for FfmpegBackend {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    #[instrument(skip(self, profile))]
    fn create_encoder(
        &mut self,
        profile: &EncoderProfile,
        output: &Path,
    ) -> Result<Box<dyn Encoder>, BackendError> {
        let input = InputDevice::open(profile.source)?;

        Ok(Box::new(FfmpegEncoder {
            program: self.program.clone(),
            input,
            profile: *profile,
            output: output.to_path_buf(),
            child: None,
            stream: None,
            pump: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
        }))
    }
}

/// Command-line arguments that turn stdin PCM into the profile's file format.
pub(crate) fn encoder_args(profile: &EncoderProfile, output: &Path) -> Vec<OsString> {
    let rate = profile.sample_rate.to_string();
    let channels = profile.channels.to_string();
    let codec = match profile.codec {
        Codec::Aac => "aac",
    };
    let container = match profile.container {
        Container::Mpeg4 => "mp4",
    };
    let bit_rate = profile.bit_rate.to_string();

    let mut args: Vec<OsString> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "f32le",
        "-ar",
        rate.as_str(),
        "-ac",
        channels.as_str(),
        "-i",
        "pipe:0",
        "-c:a",
        codec,
        "-b:a",
        bit_rate.as_str(),
        "-ar",
        rate.as_str(),
        "-ac",
        channels.as_str(),
        "-f",
        container,
        "-y",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(output.as_os_str().to_owned());
    args
}

#[derive(Debug, Default)]
struct PumpReport {
    frames: u64,
    error: Option<String>,
}

struct FfmpegEncoder {
    program: PathBuf,
    input: InputDevice,
    profile: EncoderProfile,
    output: PathBuf,
    child: Option<Child>,
    stream: Option<Stream>,
    pump: Option<JoinHandle<PumpReport>>,
    shutdown: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl FfmpegEncoder {
    fn launch(&mut self) -> Result<(), BackendError> {
        let mut child = Command::new(&self.program)
            .args(encoder_args(&self.profile, &self.output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::from_io(&e, "Failed to spawn encoder"))?;

        let stdin = child.stdin.take();
        self.child = Some(child);
        let stdin = stdin
            .ok_or_else(|| BackendError::new(BackendErrorKind::Io, "Encoder stdin unavailable"))?;

        let resampler = if self.input.sample_rate() != self.profile.sample_rate {
            Some(Resampler::new(
                self.input.sample_rate(),
                self.profile.sample_rate,
            )?)
        } else {
            None
        };

        let (pcm_tx, pcm_rx) = mpsc::sync_channel(PCM_QUEUE_DEPTH);

        let pump = thread::Builder::new()
            .name("ptt-encoder-pump".to_string())
            .spawn(move || pump_pcm(pcm_rx, stdin, resampler))
            .map_err(|e| BackendError::from_io(&e, "Failed to spawn encoder pump"))?;
        self.pump = Some(pump);

        self.shutdown.store(false, Ordering::Release);
        let stream = self.input.build_stream(
            pcm_tx,
            Arc::clone(&self.shutdown),
            Arc::clone(&self.dropped),
        )?;
        device::play(&stream)?;
        self.stream = Some(stream);

        Ok(())
    }

    /// Stop the device and wait for the pump to drain into the encoder.
    fn drain(&mut self) -> PumpReport {
        self.shutdown.store(true, Ordering::Release);
        // Dropping the stream drops the callback and with it the last sender.
        drop(self.stream.take());

        match self.pump.take().map(JoinHandle::join) {
            Some(Ok(report)) => report,
            Some(Err(_)) => PumpReport {
                frames: 0,
                error: Some("encoder pump panicked".to_string()),
            },
            None => PumpReport::default(),
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn start(&mut self) -> Result<(), BackendError> {
        if let Err(e) = self.launch() {
            self.release();
            return Err(e);
        }

        info!(program = ?self.program, output = ?self.output, "Encoder started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        let report = self.drain();

        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!(dropped_blocks = dropped, "Encoder fell behind, audio blocks dropped");
        }

        let Some(child) = self.child.take() else {
            return Err(BackendError::new(
                BackendErrorKind::Io,
                "encoder was never started",
            ));
        };

        let output = child
            .wait_with_output()
            .map_err(|e| BackendError::from_io(&e, "Failed to wait for encoder"))?;

        if report.frames == 0 {
            // ffmpeg may still have written a header-only container.
            let _ = fs::remove_file(&self.output);
            return Err(BackendError::new(
                BackendErrorKind::NoData,
                "stream produced no frames",
            ));
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::new(
                BackendErrorKind::Io,
                format!("encoder exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        if let Some(error) = report.error {
            return Err(BackendError::new(BackendErrorKind::Io, error));
        }

        debug!(frames = report.frames, "Encoder finalized clip");
        Ok(())
    }

    fn release(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        drop(self.stream.take());

        if let Some(mut child) = self.child.take() {
            // Killing first unblocks a pump stuck writing into a full pipe.
            let _ = child.kill();
            let _ = child.wait();
            debug!("Encoder process terminated");
        }

        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

fn pump_pcm(
    pcm_rx: Receiver<Vec<f32>>,
    stdin: ChildStdin,
    mut resampler: Option<Resampler>,
) -> PumpReport {
    let mut writer = BufWriter::new(stdin);
    let mut report = PumpReport::default();

    for block in pcm_rx.iter() {
        let samples = match resampler.as_mut() {
            Some(r) => match r.process(&block) {
                Ok(samples) => samples,
                Err(e) => {
                    report.error = Some(e.reason);
                    return report;
                }
            },
            None => block,
        };

        if let Err(e) = write_pcm(&mut writer, &samples) {
            report.error = Some(format!("Failed to feed encoder: {}", e));
            return report;
        }
        report.frames += samples.len() as u64;
    }

    if let Some(r) = resampler.as_mut() {
        match r.flush() {
            Ok(tail) => {
                if let Err(e) = write_pcm(&mut writer, &tail) {
                    report.error = Some(format!("Failed to feed encoder: {}", e));
                    return report;
                }
                report.frames += tail.len() as u64;
            }
            Err(e) => report.error = Some(e.reason),
        }
    }

    if let Err(e) = writer.flush() {
        report.error = Some(format!("Failed to flush encoder input: {}", e));
    }

    // Dropping the writer closes stdin, which tells ffmpeg to finalize.
    report
}

fn write_pcm<W: Write>(writer: &mut W, samples: &[f32]) -> std::io::Result<()> {
    for sample in samples {
        writer.write_all(&sample.to_le_bytes())?;
    }
    Ok(())
}
