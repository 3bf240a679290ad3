//! Output lookahead limiter
//!
//! Last stage of the practice graph:
//!   grain source → pitch stage → volume → **limiter** → device
//!
//! The volume control allows up to +12 dB of boost, and transposition can
//! raise peaks, so the output is limited to −0.3 dBFS. A short lookahead lets
//! the gain come down before a peak leaves the delay line; the limiter only
//! ever reduces gain.
//!
//! Per sample:
//! 1. the input peak yields a target gain (`threshold / peak`, or 1.0)
//! 2. the minimum target over the lookahead window is the gain to reach
//! 3. an attack/release envelope smooths toward it
//! 4. the delayed sample is scaled and written out
//!
//! All state lives in fixed arrays; processing never allocates.

use crate::types::StereoBuffer;

/// Ring size, enough for the lookahead at 192 kHz
const MAX_DELAY: usize = 1024;

/// Lookahead time in seconds
const LOOKAHEAD_SECS: f32 = 0.0015;

/// Release time-constant in seconds
const RELEASE_SECS: f32 = 0.1;

/// Default ceiling in dBFS
pub const DEFAULT_THRESHOLD_DB: f32 = -0.3;

/// Feed-forward lookahead limiter.
pub struct MasterLimiter {
    threshold: f32,
    lookahead: usize,

    /// `delay[channel][position]`
    delay: [[f32; MAX_DELAY]; 2],
    target_gains: [f32; MAX_DELAY],
    write_pos: usize,

    /// Current smoothed gain (1.0 = unity)
    gain: f32,
    /// `attack_coeff^lookahead ≈ 0.01`
    attack_coeff: f32,
    release_coeff: f32,
}

impl MasterLimiter {
    /// Limiter at −0.3 dBFS for the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self::with_threshold_db(sample_rate, DEFAULT_THRESHOLD_DB)
    }

    /// Limiter with a custom ceiling in dBFS
    pub fn with_threshold_db(sample_rate: u32, db: f32) -> Self {
        let sample_rate = sample_rate.max(1) as f32;
        let threshold = 10.0_f32.powf(db / 20.0);

        let lookahead = ((LOOKAHEAD_SECS * sample_rate).round() as usize).clamp(1, MAX_DELAY);

        // coeff^N = 0.01  →  coeff = exp(ln 0.01 / N)
        let attack_coeff = (-4.605_17 / lookahead as f32).exp();
        // coeff = exp(-1 / (τ × fs))
        let release_coeff = (-1.0 / (RELEASE_SECS * sample_rate)).exp();

        Self {
            threshold,
            lookahead,
            delay: [[0.0; MAX_DELAY]; 2],
            target_gains: [1.0; MAX_DELAY],
            write_pos: 0,
            gain: 1.0,
            attack_coeff,
            release_coeff,
        }
    }

    /// Latency in samples introduced by this limiter
    pub fn latency_samples(&self) -> usize {
        self.lookahead
    }

    /// Clear the delay line and return to unity gain
    pub fn reset(&mut self) {
        self.delay = [[0.0; MAX_DELAY]; 2];
        self.target_gains = [1.0; MAX_DELAY];
        self.write_pos = 0;
        self.gain = 1.0;
    }

    /// Process a stereo buffer in place
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        for sample in buffer.iter_mut() {
            let peak = sample.peak();
            self.target_gains[self.write_pos] = if peak > self.threshold {
                self.threshold / peak
            } else {
                1.0
            };

            let min_gain = self.window_min_gain();
            let coeff = if min_gain < self.gain {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain = self.gain * coeff + min_gain * (1.0 - coeff);

            let read_pos = (self.write_pos + MAX_DELAY - self.lookahead) % MAX_DELAY;
            let out_left = self.delay[0][read_pos] * self.gain;
            let out_right = self.delay[1][read_pos] * self.gain;

            self.delay[0][self.write_pos] = sample.left;
            self.delay[1][self.write_pos] = sample.right;

            sample.left = out_left;
            sample.right = out_right;

            self.write_pos = (self.write_pos + 1) % MAX_DELAY;
        }
    }

    #[inline]
    fn window_min_gain(&self) -> f32 {
        (0..self.lookahead)
            .map(|i| self.target_gains[(self.write_pos + MAX_DELAY - i) % MAX_DELAY])
            .fold(1.0_f32, f32::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    fn constant(level: f32, len: usize) -> StereoBuffer {
        StereoBuffer::from_vec(vec![StereoSample::new(level, -level); len])
    }

    #[test]
    fn test_quiet_signal_passes_unchanged() {
        let mut limiter = MasterLimiter::new(48000);
        let level = limiter.threshold * 0.5;

        let mut warmup = constant(0.0, 128);
        limiter.process(&mut warmup);

        let mut buf = constant(level, 128);
        limiter.process(&mut buf);

        for i in limiter.lookahead..128 {
            assert!((buf[i].left - level).abs() < 1e-5, "left[{}] = {}", i, buf[i].left);
            assert!((buf[i].right + level).abs() < 1e-5, "right[{}] = {}", i, buf[i].right);
        }
    }

    #[test]
    fn test_boosted_signal_is_held_near_ceiling() {
        let mut limiter = MasterLimiter::new(48000);
        let threshold = limiter.threshold;

        let mut buf = constant(threshold * 4.0, 512);
        limiter.process(&mut buf);

        for i in 256..512 {
            assert!(buf[i].peak() <= threshold * 1.05, "sample {} = {}", i, buf[i].peak());
        }
    }

    #[test]
    fn test_reset_restores_unity() {
        let mut limiter = MasterLimiter::new(48000);
        let mut hot = constant(limiter.threshold * 2.0, 256);
        limiter.process(&mut hot);
        assert!(limiter.gain < 1.0);

        limiter.reset();
        assert_eq!(limiter.gain, 1.0);
    }

    #[test]
    fn test_latency_follows_sample_rate() {
        assert_eq!(MasterLimiter::new(48000).latency_samples(), 72);
        assert_eq!(MasterLimiter::new(96000).latency_samples(), 144);
    }
}
