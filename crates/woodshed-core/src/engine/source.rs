//! Time-stretching grain source
//!
//! Reads the shared decoded buffer and feeds it through a quality-mode
//! [`TimeStretcher`]. For every output block of `n` frames the source
//! consumes `n × rate × (buffer_rate / device_rate)` input frames; the
//! fractional remainder is carried to the next block so long-run position
//! matches the engine clock exactly.
//!
//! When the buffer's sample rate differs from the device's, the stretcher
//! also transposes by the rate ratio so the material plays at its original
//! pitch without a separate resampler.

use crate::audio::MAX_BUFFER_SIZE;
use crate::timestretch::{QualityMode, TimeStretcher};
use crate::types::{StereoBuffer, TrackBuffer, MAX_PLAYBACK_RATE};

pub struct GrainSource {
    buffer: TrackBuffer,
    stretcher: TimeStretcher,
    quality: QualityMode,
    /// Input frames per output frame at rate 1.0
    rate_ratio: f64,
    /// Read head in source frames
    position: f64,
    playing: bool,
    /// Pre-allocated input block
    input: StereoBuffer,
    max_input: usize,
}

impl GrainSource {
    /// Build a source for `buffer` rendered at `device_rate`
    ///
    /// Allocates; call on the control side and ship the result to the audio
    /// thread in an `EngineCommand::LoadSource`.
    pub fn new(buffer: TrackBuffer, device_rate: u32, quality: QualityMode) -> Self {
        let device_rate = device_rate.max(1);
        let rate_ratio = buffer.sample_rate() as f64 / device_rate as f64;

        let mut stretcher = TimeStretcher::with_quality(device_rate, quality);
        if (rate_ratio - 1.0).abs() > f64::EPSILON {
            stretcher.set_pitch_semitones(12.0 * rate_ratio.log2());
        }

        let max_input = (MAX_BUFFER_SIZE as f64 * MAX_PLAYBACK_RATE * rate_ratio).ceil() as usize + 2;

        Self {
            buffer,
            stretcher,
            quality,
            rate_ratio,
            position: 0.0,
            playing: false,
            input: StereoBuffer::with_capacity(max_input),
            max_input,
        }
    }

    pub fn quality(&self) -> QualityMode {
        self.quality
    }

    pub fn buffer(&self) -> &TrackBuffer {
        &self.buffer
    }

    /// Read head in source frames
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True once the read head has passed the end of the buffer
    pub fn is_finished(&self) -> bool {
        self.position >= self.buffer.len() as f64
    }

    /// Start rendering from `offset_frames` (source frames)
    pub fn start(&mut self, offset_frames: f64) {
        self.position = offset_frames.clamp(0.0, self.buffer.len() as f64);
        self.stretcher.reset();
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Render one block at `rate` into `output` (whose length sets the block size)
    ///
    /// Real-time safe: only touches pre-allocated buffers.
    pub fn render(&mut self, rate: f64, output: &mut StereoBuffer) {
        if !self.playing || output.is_empty() {
            output.fill_silence();
            return;
        }

        let wanted = self.position + output.len() as f64 * rate * self.rate_ratio;
        let start = self.position.floor() as usize;
        let end = wanted.floor() as usize;
        let input_len = (end - start).min(self.max_input);

        self.input.set_len_from_capacity(input_len);
        for (i, frame) in self.input.iter_mut().enumerate() {
            *frame = self.buffer.frame(start + i);
        }
        self.position = wanted;

        self.stretcher.process(&self.input, output);
    }
}
