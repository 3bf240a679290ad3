//! User-facing speed and pitch knobs
//!
//! Holds the speed multiplier and explicit transposition the player has
//! chosen, independent of the audio graph. Setters clamp and report whether
//! anything changed; the orchestrator drains [`PitchTempoEvent`]s and pushes
//! the resulting values into `AudioCore`.

use crate::types::{MAX_PITCH_SEMITONES, MAX_PLAYBACK_RATE, MIN_PITCH_SEMITONES, MIN_PLAYBACK_RATE};

/// Speed presets offered in the UI
pub const SPEED_PRESETS: [f64; 5] = [0.5, 0.75, 1.0, 1.25, 1.5];

/// Pitch presets: octave, fifth and fourth either way, plus unison
pub const PITCH_PRESETS: [f64; 7] = [-12.0, -7.0, -5.0, 0.0, 5.0, 7.0, 12.0];

/// Semitones per octave
pub const OCTAVE: f64 = 12.0;

/// Change notifications, emitted only when a value actually changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchTempoEvent {
    SpeedChanged(f64),
    PitchChanged(f64),
    PreservePitchChanged(bool),
}

#[derive(Debug, Clone)]
pub struct PitchTempoController {
    speed: f64,
    pitch: f64,
    preserve_pitch: bool,
    events: Vec<PitchTempoEvent>,
}

impl Default for PitchTempoController {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchTempoController {
    pub fn new() -> Self {
        Self {
            speed: 1.0,
            pitch: 0.0,
            preserve_pitch: true,
            events: Vec::new(),
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn preserve_pitch(&self) -> bool {
        self.preserve_pitch
    }

    /// Set the speed multiplier, clamped to [0.25, 4.0]
    ///
    /// Returns the resulting speed. Non-finite input leaves the value as is.
    pub fn set_speed(&mut self, value: f64) -> f64 {
        if !value.is_finite() {
            log::warn!("Ignoring non-finite speed {}", value);
            return self.speed;
        }
        let clamped = value.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
        if clamped != self.speed {
            self.speed = clamped;
            self.events.push(PitchTempoEvent::SpeedChanged(clamped));
        }
        self.speed
    }

    /// Set the explicit transposition, clamped to [-24, 24] semitones
    pub fn set_pitch(&mut self, semitones: f64) -> f64 {
        if !semitones.is_finite() {
            log::warn!("Ignoring non-finite pitch {}", semitones);
            return self.pitch;
        }
        let clamped = semitones.clamp(MIN_PITCH_SEMITONES, MAX_PITCH_SEMITONES);
        if clamped != self.pitch {
            self.pitch = clamped;
            self.events.push(PitchTempoEvent::PitchChanged(clamped));
        }
        self.pitch
    }

    pub fn adjust_speed(&mut self, delta: f64) -> f64 {
        self.set_speed(self.speed + delta)
    }

    pub fn increase_pitch(&mut self, semitones: f64) -> f64 {
        self.set_pitch(self.pitch + semitones)
    }

    pub fn decrease_pitch(&mut self, semitones: f64) -> f64 {
        self.set_pitch(self.pitch - semitones)
    }

    pub fn octave_up(&mut self) -> f64 {
        self.increase_pitch(OCTAVE)
    }

    pub fn octave_down(&mut self) -> f64 {
        self.decrease_pitch(OCTAVE)
    }

    pub fn set_preserve_pitch(&mut self, preserve: bool) {
        if preserve != self.preserve_pitch {
            self.preserve_pitch = preserve;
            self.events.push(PitchTempoEvent::PreservePitchChanged(preserve));
        }
    }

    /// Effective transposition including the tempo-derived shift
    ///
    /// With pitch preservation off, speeding up raises the pitch the way an
    /// unprocessed speed change would: `12 × log2(speed)` semitones on top of
    /// the explicit shift.
    pub fn combined_pitch(&self) -> f64 {
        if self.preserve_pitch {
            self.pitch
        } else {
            self.pitch + OCTAVE * self.speed.log2()
        }
    }

    /// Index of the speed preset closest to the current speed
    pub fn nearest_speed_preset(&self) -> usize {
        nearest_index(&SPEED_PRESETS, self.speed)
    }

    /// Index of the pitch preset closest to the current pitch
    pub fn nearest_pitch_preset(&self) -> usize {
        nearest_index(&PITCH_PRESETS, self.pitch)
    }

    /// Apply a speed preset by index; `None` if the index is out of range
    pub fn apply_speed_preset(&mut self, index: usize) -> Option<f64> {
        let value = *SPEED_PRESETS.get(index)?;
        Some(self.set_speed(value))
    }

    /// Apply a pitch preset by index; `None` if the index is out of range
    pub fn apply_pitch_preset(&mut self, index: usize) -> Option<f64> {
        let value = *PITCH_PRESETS.get(index)?;
        Some(self.set_pitch(value))
    }

    /// Back to original speed and pitch
    pub fn reset(&mut self) {
        self.set_speed(1.0);
        self.set_pitch(0.0);
    }

    /// Drain pending change events
    pub fn take_events(&mut self) -> Vec<PitchTempoEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Index minimizing `|list[i] - value|`; the first index wins ties
fn nearest_index(list: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (i, &candidate) in list.iter().enumerate() {
        let diff = (candidate - value).abs();
        if diff < best_diff {
            best = i;
            best_diff = diff;
        }
    }
    best
}
