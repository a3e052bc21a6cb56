use crate::{BackendError, BackendErrorKind};

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

/// Input frames consumed per resampler pass.
pub(crate) const CHUNK_SIZE: usize = 1024;

/// Streaming mono resampler from the device rate to the profile rate.
///
/// Input arrives in arbitrary callback-sized slices; only whole chunks are
/// processed until [`flush`](Self::flush) pads and drains the remainder.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    pending: Vec<f32>,
}

impl Resampler {
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self, BackendError> {
        let sub_chunks = 2;

        let resampler = Fft::<f32>::new(
            input_rate as usize,  // sample_rate_input
            output_rate as usize, // sample_rate_output
            CHUNK_SIZE,           // chunk_size
            sub_chunks,           // sub_chunks
            1,                    // nbr_channels (mono)
            FixedSync::Input,     // fixed
        )
        .map_err(|e| resampling_error(format!("Failed to create resampler: {}", e)))?;

        debug!(input_rate, output_rate, chunk_size = CHUNK_SIZE, "Resampler initialized");

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
        })
    }

    /// Feed samples, returning whatever whole chunks produced.
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>, BackendError> {
        self.pending.extend_from_slice(samples);

        let whole = self.pending.len() / CHUNK_SIZE * CHUNK_SIZE;
        if whole == 0 {
            return Ok(Vec::new());
        }

        let ready: Vec<f32> = self.pending.drain(..whole).collect();
        let mut output = Vec::with_capacity(self.estimated_len(ready.len()));
        for chunk in ready.chunks(CHUNK_SIZE) {
            self.process_chunk(chunk, &mut output)?;
        }

        Ok(output)
    }

    /// Zero-pad and process the partial chunk left over at end of stream.
    pub fn flush(&mut self) -> Result<Vec<f32>, BackendError> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let remainder = std::mem::take(&mut self.pending);
        let expected = self.estimated_len(remainder.len());

        let mut padded = remainder;
        padded.resize(CHUNK_SIZE, 0.0);

        let mut output = Vec::with_capacity(expected);
        self.process_chunk(&padded, &mut output)?;
        output.truncate(expected);

        debug!(output_len = output.len(), "Resampler flushed");

        Ok(output)
    }

    fn estimated_len(&self, input_len: usize) -> usize {
        (input_len as f64 * self.output_rate as f64 / self.input_rate as f64) as usize
    }

    fn process_chunk(&mut self, chunk: &[f32], output: &mut Vec<f32>) -> Result<(), BackendError> {
        // Create adapter for input (frames, channels)
        let input_adapter = InterleavedSlice::new(chunk, 1, CHUNK_SIZE)
            .map_err(|e| resampling_error(format!("Failed to create input adapter: {}", e)))?;

        let output_frames = self.resampler.output_frames_max();
        let mut output_chunk = vec![0.0f32; output_frames];

        let mut output_adapter = InterleavedSlice::new_mut(&mut output_chunk, 1, output_frames)
            .map_err(|e| resampling_error(format!("Failed to create output adapter: {}", e)))?;

        let (_input_frames, output_frames_written) = self
            .resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| resampling_error(format!("Resampling failed: {}", e)))?;

        output.extend_from_slice(&output_chunk[..output_frames_written]);

        Ok(())
    }
}

fn resampling_error(reason: String) -> BackendError {
    BackendError::new(BackendErrorKind::Io, reason)
}
