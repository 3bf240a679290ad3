//! Common types for Woodshed
//!
//! This module contains the fundamental audio types used throughout the
//! practice engine: stereo frames for real-time processing and the decoded
//! sample buffer handed in by a buffer provider.

use std::ops::{Index, IndexMut};

use basedrop::Shared;

use crate::engine::gc_handle;

/// Default sample rate used when a device does not report one (48kHz)
pub const SAMPLE_RATE: u32 = 48000;

/// Playback rate range accepted by the engine
pub const MIN_PLAYBACK_RATE: f64 = 0.25;
pub const MAX_PLAYBACK_RATE: f64 = 4.0;

/// Pitch shift range in semitones (two octaves either way)
pub const MIN_PITCH_SEMITONES: f64 = -24.0;
pub const MAX_PITCH_SEMITONES: f64 = 24.0;

/// Output volume range in dB
pub const MIN_VOLUME_DB: f64 = -60.0;
pub const MAX_VOLUME_DB: f64 = 12.0;

/// Audio sample type (32-bit float for processing)
pub type Sample = f32;

/// A single stereo sample (left and right channels)
///
/// Uses `#[repr(C)]` to ensure predictable memory layout: [left, right].
/// This enables zero-copy conversion between `&[StereoSample]` and `&[f32]`
/// (interleaved format) using bytemuck, which is what signalsmith-stretch
/// consumes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono sample (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Get the peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

impl std::ops::MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, factor: Sample) {
        self.left *= factor;
        self.right *= factor;
    }
}

/// A buffer of stereo samples used by the real-time graph
///
/// Buffers on the audio thread are pre-allocated to `MAX_BUFFER_SIZE` and
/// only ever change their working length, never their capacity.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a new buffer with the specified capacity (in stereo samples)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create a buffer from an existing Vec of StereoSamples
    pub fn from_vec(samples: Vec<StereoSample>) -> Self {
        Self { samples }
    }

    /// Get the number of stereo samples in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Fills any newly exposed elements with silence. Callers must stay within
    /// the capacity the buffer was created with.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        let current_len = self.samples.len();
        if new_len > current_len {
            debug_assert!(
                new_len <= self.samples.capacity(),
                "set_len_from_capacity called with len > capacity"
            );
            self.samples.resize(new_len, StereoSample::silence());
        } else {
            self.samples.truncate(new_len);
        }
    }

    /// Fill the buffer with silence
    pub fn fill_silence(&mut self) {
        self.samples.fill(StereoSample::silence());
    }

    /// Get a slice of the samples
    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    /// Get a mutable slice of the samples
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Zero-copy view of samples as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.samples)
    }

    /// Zero-copy mutable view of samples as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved_mut(&mut self) -> &mut [Sample] {
        bytemuck::cast_slice_mut(&mut self.samples)
    }

    /// Copy from another buffer without reallocating (capacity permitting)
    pub fn copy_from(&mut self, other: &StereoBuffer) {
        let len = other.samples.len();
        debug_assert!(
            len <= self.samples.capacity(),
            "copy_from: insufficient capacity ({} < {})",
            self.samples.capacity(),
            len
        );
        self.set_len_from_capacity(len);
        self.samples[..len].copy_from_slice(&other.samples[..len]);
    }

    /// Scale all samples by a factor
    pub fn scale(&mut self, factor: Sample) {
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    /// Get an iterator over the samples
    pub fn iter(&self) -> impl Iterator<Item = &StereoSample> {
        self.samples.iter()
    }

    /// Get a mutable iterator over the samples
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StereoSample> {
        self.samples.iter_mut()
    }

    /// Get the peak amplitude in the buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.peak()).fold(0.0, Sample::max)
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

/// A decoded, non-interleaved sample buffer
///
/// This is what a buffer provider hands to the engine: one `Vec<f32>` per
/// channel at a fixed sample rate. The engine never decodes containers itself.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<Sample>>,
}

/// Shared reference to a decoded buffer
///
/// The same allocation is read by the audio thread, the waveform and the
/// control side. Dropping the last reference on the audio thread defers the
/// deallocation to the GC thread.
pub type TrackBuffer = Shared<SampleBuffer>;

impl SampleBuffer {
    /// Build a buffer from per-channel sample data
    ///
    /// Returns `None` if there are no channels, the channels disagree on
    /// length, or the sample rate is zero.
    pub fn new(sample_rate: u32, channels: Vec<Vec<Sample>>) -> Option<Self> {
        if sample_rate == 0 || channels.is_empty() {
            return None;
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return None;
        }
        Some(Self { sample_rate, channels })
    }

    /// Build a buffer from interleaved samples [c0, c1, ..., c0, c1, ...]
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, interleaved: &[Sample]) -> Option<Self> {
        if channel_count == 0 {
            return None;
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    /// Wrap this buffer in a GC-backed shared pointer
    pub fn into_shared(self) -> TrackBuffer {
        Shared::new(&gc_handle(), self)
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn len(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Samples for one channel
    pub fn channel(&self, index: usize) -> Option<&[Sample]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    /// Read one frame as stereo (mono buffers are duplicated to both sides)
    #[inline]
    pub fn frame(&self, index: usize) -> StereoSample {
        match self.channels.as_slice() {
            [mono] => StereoSample::mono(mono.get(index).copied().unwrap_or(0.0)),
            [left, right, ..] => StereoSample::new(
                left.get(index).copied().unwrap_or(0.0),
                right.get(index).copied().unwrap_or(0.0),
            ),
            [] => StereoSample::silence(),
        }
    }
}

/// Playback state of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Convert decibels to linear gain
#[inline]
pub fn db_to_gain(db: f64) -> f32 {
    10.0_f64.powf(db / 20.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_buffer_rejects_mismatched_channels() {
        assert!(SampleBuffer::new(48000, vec![vec![0.0; 4], vec![0.0; 3]]).is_none());
        assert!(SampleBuffer::new(48000, vec![]).is_none());
        assert!(SampleBuffer::new(0, vec![vec![0.0; 4]]).is_none());
    }

    #[test]
    fn test_sample_buffer_duration() {
        let buffer = SampleBuffer::new(1000, vec![vec![0.0; 2500]]).unwrap();
        assert_eq!(buffer.len(), 2500);
        assert!((buffer.duration() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_sample_buffer_from_interleaved() {
        let buffer = SampleBuffer::from_interleaved(48000, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[1.0, 3.0]);
        assert_eq!(buffer.frame(1), StereoSample::new(3.0, 4.0));
    }

    #[test]
    fn test_mono_frame_is_duplicated() {
        let buffer = SampleBuffer::new(48000, vec![vec![0.5, -0.5]]).unwrap();
        assert_eq!(buffer.frame(1), StereoSample::mono(-0.5));
        // Out of range reads are silent
        assert_eq!(buffer.frame(10), StereoSample::silence());
    }

    #[test]
    fn test_db_to_gain() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_gain(-6.0) - 0.501).abs() < 1e-3);
    }

    #[test]
    fn test_stereo_buffer_interleaved_view() {
        let buffer = StereoBuffer::from_vec(vec![StereoSample::new(1.0, 2.0), StereoSample::new(3.0, 4.0)]);
        assert_eq!(buffer.as_interleaved(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.peak(), 4.0);
    }
}
