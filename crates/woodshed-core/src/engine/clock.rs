//! Engine sample clock
//!
//! A monotonically increasing frame counter advanced by the audio thread after
//! each rendered block. The control side derives elapsed time from it without
//! locking; relaxed ordering is enough because each read only needs *a*
//! recent value, not one ordered against other memory.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::types::SAMPLE_RATE;

#[derive(Debug)]
pub struct EngineClock {
    frames: AtomicU64,
    sample_rate: AtomicU32,
}

impl EngineClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate: AtomicU32::new(sample_rate.max(1)),
        }
    }

    /// Frames rendered since the graph started
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Clock time in seconds
    #[inline]
    pub fn seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate() as f64
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Called by the backend once the device rate is known
    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate.max(1), Ordering::Relaxed);
    }

    /// Advance by a rendered block (audio thread only)
    #[inline]
    pub fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::Relaxed);
    }
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::new(SAMPLE_RATE)
    }
}
