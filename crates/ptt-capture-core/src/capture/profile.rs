use std::fmt;

/// Microphone tuning requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Voice-optimised capture (echo cancellation / gain control where available).
    ///
    /// Desktop hosts have no voice-tuned source, so this opens the default
    /// input device there.
    VoiceCommunication,
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// ISO base media (MPEG-4 Part 14).
    Mpeg4,
}

/// Audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Advanced Audio Coding, low-complexity profile.
    Aac,
}

/// The single encoder configuration every clip is recorded with.
///
/// Fixed policy, not negotiated with the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderProfile {
    /// Input tuning, used to pick the capture device.
    pub source: InputSource,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Target bitrate in bits per second.
    pub bit_rate: u32,
    /// Container format.
    pub container: Container,
    /// Codec.
    pub codec: Codec,
    /// MIME type advertised to clip consumers.
    pub mime_type: &'static str,
    /// File extension for clip files, without the dot.
    pub extension: &'static str,
}

/// 16 kHz mono AAC in MP4 at 128 kbps.
pub const VOICE_PROFILE: EncoderProfile = EncoderProfile {
    source: InputSource::VoiceCommunication,
    sample_rate: 16_000,
    channels: 1,
    bit_rate: 128_000,
    container: Container::Mpeg4,
    codec: Codec::Aac,
    mime_type: "audio/aac",
    extension: "m4a",
};

impl fmt::Display for EncoderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?} {} Hz x{} @ {} bps",
            self.codec, self.container, self.sample_rate, self.channels, self.bit_rate
        )
    }
}
