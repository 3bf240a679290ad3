//! Pitch-shift stage
//!
//! A fixed-window transposer between the grain source and the volume stage.
//! At 0 semitones the stage is bypassed and the dry signal passes through
//! untouched (no stretcher latency, no smearing).

use crate::audio::MAX_BUFFER_SIZE;
use crate::timestretch::TimeStretcher;
use crate::types::StereoBuffer;

pub struct PitchStage {
    stretcher: TimeStretcher,
    semitones: f64,
    scratch: StereoBuffer,
}

impl PitchStage {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            stretcher: TimeStretcher::new_with_sample_rate(sample_rate),
            semitones: 0.0,
            scratch: StereoBuffer::with_capacity(MAX_BUFFER_SIZE),
        }
    }

    pub fn semitones(&self) -> f64 {
        self.semitones
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.semitones == 0.0
    }

    pub fn set_semitones(&mut self, semitones: f64) {
        let was_bypassed = self.is_bypassed();
        self.semitones = semitones;
        self.stretcher.set_pitch_semitones(semitones);
        // Coming out of bypass: drop whatever the stretcher held from before
        if was_bypassed && !self.is_bypassed() {
            self.stretcher.reset();
        }
    }

    /// Clear internal history (on seek or source change)
    pub fn reset(&mut self) {
        self.stretcher.reset();
    }

    /// Transpose `buffer` in place
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        if self.is_bypassed() {
            return;
        }
        self.scratch.set_len_from_capacity(buffer.len());
        self.stretcher.process(buffer, &mut self.scratch);
        buffer.copy_from(&self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    #[test]
    fn test_zero_semitones_is_dry() {
        let mut stage = PitchStage::new(48000);
        let mut buffer = StereoBuffer::from_vec(vec![StereoSample::new(0.25, -0.25); 256]);
        stage.process(&mut buffer);
        assert!(buffer.iter().all(|s| *s == StereoSample::new(0.25, -0.25)));
    }

    #[test]
    fn test_nonzero_semitones_engages() {
        let mut stage = PitchStage::new(48000);
        stage.set_semitones(5.0);
        assert!(!stage.is_bypassed());

        let mut buffer = StereoBuffer::from_vec(vec![StereoSample::mono(0.1); 256]);
        stage.process(&mut buffer);
        assert_eq!(buffer.len(), 256);

        stage.set_semitones(0.0);
        assert!(stage.is_bypassed());
    }
}
