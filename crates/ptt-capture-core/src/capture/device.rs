use crate::{BackendError, BackendErrorKind, InputSource};

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc::{SyncSender, TrySendError},
};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use tracing::{error, info, instrument};

/// A microphone opened for mono voice capture.
pub struct InputDevice {
    device: Device,
    config: StreamConfig,
}

impl InputDevice {
    /// Open the device serving `source`.
    #[instrument]
    pub fn open(source: InputSource) -> Result<Self, BackendError> {
        let host = cpal::default_host();

        // cpal exposes no voice-tuned endpoint; the default input is the one
        // the desktop routes speech through.
        let device = match source {
            InputSource::VoiceCommunication => host.default_input_device(),
        }
        .ok_or_else(|| {
            BackendError::new(BackendErrorKind::DeviceUnavailable, "No microphone found")
        })?;

        let config = device.default_input_config().map_err(|e| {
            BackendError::new(
                BackendErrorKind::DeviceUnavailable,
                format!("Failed to get config: {}", e),
            )
        })?;

        info!(
            ?source,
            device_id = ?device.id(),
            sample_rate = config.sample_rate(),
            channels = config.channels(),
            "Input device opened"
        );

        Ok(Self {
            device,
            config: config.into(),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Build a paused stream that mixes each callback down to mono and hands
    /// it to `sink`. Blocks are dropped and counted if the sink is full.
    pub fn build_stream(
        &self,
        sink: SyncSender<Vec<f32>>,
        shutdown: Arc<AtomicBool>,
        dropped: Arc<AtomicU64>,
    ) -> Result<Stream, BackendError> {
        let channels = usize::from(self.config.channels.max(1));

        self.device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Once stop() raises the flag nothing more reaches the encoder,
                    // even if the backend fires one last callback.
                    if shutdown.load(Ordering::Acquire) {
                        return;
                    }

                    let mono: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                            .collect()
                    };

                    if let Err(TrySendError::Full(_)) = sink.try_send(mono) {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| {
                let kind = match e {
                    cpal::BuildStreamError::DeviceNotAvailable => {
                        BackendErrorKind::DeviceUnavailable
                    }
                    _ => BackendErrorKind::DeviceBusy,
                };
                BackendError::new(kind, format!("Failed to build stream: {}", e))
            })
    }
}

/// Start a built stream.
pub fn play(stream: &Stream) -> Result<(), BackendError> {
    stream.play().map_err(|e| {
        let kind = match e {
            cpal::PlayStreamError::DeviceNotAvailable => BackendErrorKind::DeviceUnavailable,
            _ => BackendErrorKind::DeviceBusy,
        };
        BackendError::new(kind, format!("Failed to start stream: {}", e))
    })
}
