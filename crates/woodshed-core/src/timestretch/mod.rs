//! Time-stretching via signalsmith-stretch
//!
//! Wraps the signalsmith-stretch library to change playback speed without
//! changing pitch, and to transpose without changing speed. The practice
//! engine uses two instances: one inside the grain source (speed) and one in
//! the pitch stage (transpose).

use serde::{Deserialize, Serialize};
use signalsmith_stretch::Stretch;

use crate::types::{StereoBuffer, SAMPLE_RATE};

/// Number of channels (stereo)
const CHANNELS: u32 = 2;

/// Named grain size / overlap preset for the speed stage
///
/// Larger grains smear transients less on sustained material but respond
/// more slowly; `Medium` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    Low,
    #[default]
    Medium,
    High,
}

/// Grain size and overlap in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainParams {
    pub grain_size: f64,
    pub overlap: f64,
}

impl QualityMode {
    /// All modes in ascending quality order
    pub const ALL: [QualityMode; 3] = [QualityMode::Low, QualityMode::Medium, QualityMode::High];

    /// Fixed grain parameters for this mode
    pub fn grain_params(self) -> GrainParams {
        match self {
            QualityMode::Low => GrainParams { grain_size: 0.10, overlap: 0.06 },
            QualityMode::Medium => GrainParams { grain_size: 0.12, overlap: 0.09 },
            QualityMode::High => GrainParams { grain_size: 0.16, overlap: 0.14 },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityMode::Low => "Low",
            QualityMode::Medium => "Medium",
            QualityMode::High => "High",
        }
    }
}

impl std::fmt::Display for QualityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl GrainParams {
    /// Block length in samples at the given rate
    pub fn block_length(&self, sample_rate: u32) -> usize {
        ((self.grain_size * sample_rate as f64).round() as usize).max(64)
    }

    /// Hop between successive grains in samples (grain minus overlap)
    pub fn interval(&self, sample_rate: u32) -> usize {
        (((self.grain_size - self.overlap) * sample_rate as f64).round() as usize).max(16)
    }
}

/// Time stretcher for speed changes and pitch shifting
///
/// Uses zero-copy format conversion - StereoBuffer is reinterpreted as
/// interleaved f32 without any per-frame copying.
pub struct TimeStretcher {
    /// The underlying signalsmith stretcher
    stretcher: Stretch,
    /// Pitch shift in semitones (positive = up, negative = down)
    pitch_semitones: f64,
}

impl TimeStretcher {
    /// Create a time stretcher with the library's default block sizes
    pub fn new_with_sample_rate(sample_rate: u32) -> Self {
        Self {
            stretcher: Stretch::preset_default(CHANNELS, sample_rate),
            pitch_semitones: 0.0,
        }
    }

    /// Create a time stretcher with default sample rate
    pub fn new() -> Self {
        Self::new_with_sample_rate(SAMPLE_RATE)
    }

    /// Create a time stretcher whose block and hop sizes follow a quality mode
    pub fn with_quality(sample_rate: u32, quality: QualityMode) -> Self {
        let params = quality.grain_params();
        let stretcher = Stretch::new(
            CHANNELS,
            params.block_length(sample_rate),
            params.interval(sample_rate),
        );

        Self {
            stretcher,
            pitch_semitones: 0.0,
        }
    }

    /// Set pitch shift in semitones (positive = up, negative = down)
    ///
    /// Range is clamped to -24..+24 semitones.
    pub fn set_pitch_semitones(&mut self, semitones: f64) {
        self.pitch_semitones = semitones.clamp(-24.0, 24.0);
        // None for tonality_limit means no limit on formant preservation
        self.stretcher
            .set_transpose_factor_semitones(self.pitch_semitones as f32, None);
    }

    /// Get the current pitch shift in semitones
    pub fn pitch_semitones(&self) -> f64 {
        self.pitch_semitones
    }

    /// Get the input latency in samples
    pub fn input_latency(&self) -> usize {
        self.stretcher.input_latency()
    }

    /// Get the output latency in samples
    pub fn output_latency(&self) -> usize {
        self.stretcher.output_latency()
    }

    /// Total latency in samples
    pub fn total_latency(&self) -> usize {
        self.input_latency() + self.output_latency()
    }

    /// Reset the stretcher state
    pub fn reset(&mut self) {
        self.stretcher.reset();
    }

    /// Process audio through the time stretcher
    ///
    /// The stretch ratio is implied by the buffer sizes: input_len / output_len.
    /// - input_len > output_len: speedup
    /// - input_len < output_len: slowdown
    /// - input_len = output_len: no stretching (pitch shift only)
    pub fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer) {
        if input.is_empty() {
            output.fill_silence();
            return;
        }

        let input_len = input.len();
        let output_len = output.len();

        let input_interleaved = input.as_interleaved();
        let output_interleaved = output.as_interleaved_mut();

        output_interleaved[..output_len * 2].fill(0.0);

        self.stretcher.process(
            &input_interleaved[..input_len * 2],
            &mut output_interleaved[..output_len * 2],
        );
    }

    /// Flush any remaining audio from the stretcher
    pub fn flush(&mut self, output: &mut StereoBuffer) {
        let output_len = output.len();
        let output_interleaved = output.as_interleaved_mut();

        output_interleaved[..output_len * 2].fill(0.0);
        self.stretcher.flush(&mut output_interleaved[..output_len * 2]);
    }
}

impl Default for TimeStretcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_stretcher_creation() {
        let stretcher = TimeStretcher::new();
        assert!(stretcher.input_latency() > 0);
        assert!(stretcher.output_latency() > 0);
    }

    #[test]
    fn test_quality_grain_params() {
        let low = QualityMode::Low.grain_params();
        assert_eq!(low.grain_size, 0.10);
        assert_eq!(low.overlap, 0.06);
        let high = QualityMode::High.grain_params();
        assert_eq!(high.grain_size, 0.16);
        assert_eq!(high.overlap, 0.14);
        assert_eq!(QualityMode::default(), QualityMode::Medium);
    }

    #[test]
    fn test_grain_params_in_samples() {
        let params = QualityMode::Medium.grain_params();
        assert_eq!(params.block_length(48000), 5760);
        assert_eq!(params.interval(48000), 1440);
    }

    #[test]
    fn test_process_keeps_output_length() {
        let mut stretcher = TimeStretcher::with_quality(48000, QualityMode::Low);

        let input = StereoBuffer::silence(768);
        let mut output = StereoBuffer::silence(512);

        stretcher.process(&input, &mut output);
        assert_eq!(output.len(), 512);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut stretcher = TimeStretcher::new();
        stretcher.set_pitch_semitones(40.0);
        assert_eq!(stretcher.pitch_semitones(), 24.0);
        stretcher.set_pitch_semitones(-7.0);
        assert_eq!(stretcher.pitch_semitones(), -7.0);
    }

    #[test]
    fn test_quality_mode_yaml() {
        let yaml = serde_yaml::to_string(&QualityMode::High).unwrap();
        assert_eq!(yaml.trim(), "high");
    }
}
