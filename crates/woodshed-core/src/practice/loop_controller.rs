//! A–B loop region and tempo progression
//!
//! The controller owns the loop bounds, the looping flag, the repetition
//! counter and the tempo-progression state machine. It never touches the
//! transport: [`LoopController::check_boundary`] is fed the sampled position
//! once per poll tick and answers with an optional seek target, and tempo
//! steps are reported as [`LoopEvent::TempoChanged`] for the orchestrator to
//! apply.
//!
//! Invariant: whenever both bounds are set, `end > start`. Setters that would
//! break this clear the opposite bound instead of failing.

use serde::{Deserialize, Serialize};

/// Lowest tempo a progression step can produce, in percent
pub const MIN_TEMPO_PERCENT: f64 = 25.0;

/// Highest ceiling a progression may be configured with (4× speed)
pub const MAX_TEMPO_CEILING: f64 = 400.0;

pub const DEFAULT_MAX_TEMPO_PERCENT: f64 = 200.0;
pub const DEFAULT_ORIGINAL_TEMPO: f64 = 100.0;

/// How a progression step is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncrementType {
    /// Relative to the current tempo
    #[default]
    Percentage,
    /// In the tempo's own units, normalized via `original_tempo`
    Absolute,
}

/// Stepped tempo increase after a number of completed repetitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoProgression {
    pub enabled: bool,
    pub increment_type: IncrementType,
    pub increment_value: f64,
    /// Apply one step every N completions (N ≥ 1)
    pub loop_interval: u32,
    /// Completions counted toward the next step
    pub progress_counter: u32,
    pub max_tempo_percent: f64,
    /// Baseline tempo in percent; absolute steps are normalized by it and
    /// an explicit reset returns to it
    pub original_tempo: f64,
}

impl Default for TempoProgression {
    fn default() -> Self {
        Self {
            enabled: false,
            increment_type: IncrementType::Percentage,
            increment_value: 5.0,
            loop_interval: 3,
            progress_counter: 0,
            max_tempo_percent: DEFAULT_MAX_TEMPO_PERCENT,
            original_tempo: DEFAULT_ORIGINAL_TEMPO,
        }
    }
}

impl TempoProgression {
    /// Force the configured values into their valid ranges
    fn sanitize(&mut self) {
        self.loop_interval = self.loop_interval.max(1);
        if !self.increment_value.is_finite() {
            self.increment_value = 0.0;
        }
        if !self.max_tempo_percent.is_finite() {
            self.max_tempo_percent = DEFAULT_MAX_TEMPO_PERCENT;
        }
        self.max_tempo_percent = self.max_tempo_percent.clamp(MIN_TEMPO_PERCENT, MAX_TEMPO_CEILING);
        if !(self.original_tempo.is_finite() && self.original_tempo > 0.0) {
            self.original_tempo = DEFAULT_ORIGINAL_TEMPO;
        }
    }

    /// Tempo after one step from `current`, clamped to the allowed range
    pub fn step(&self, current: f64) -> f64 {
        let next = match self.increment_type {
            IncrementType::Percentage => current * (1.0 + self.increment_value / 100.0),
            IncrementType::Absolute => current + self.increment_value / self.original_tempo * 100.0,
        };
        next.clamp(MIN_TEMPO_PERCENT, self.max_tempo_percent)
    }
}

/// Loop bounds, flag and repetition count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub enabled: bool,
    pub completed_count: u32,
}

impl LoopRegion {
    /// Both bounds set and `end > start`
    pub fn is_valid(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if e > s)
    }

    /// Drop bounds that fall outside a track of `duration` seconds
    ///
    /// Uses the same ranges the setters accept. Looping is switched off if
    /// the region is no longer valid.
    pub fn retain_within(&mut self, duration: f64) {
        if let Some(start) = self.start.filter(|&s| !(s >= 0.0 && s < duration)) {
            log::warn!("Dropping loop start {} outside track ({}s)", start, duration);
            self.start = None;
        }
        if let Some(end) = self.end.filter(|&e| !(e > 0.0 && e <= duration)) {
            log::warn!("Dropping loop end {} outside track ({}s)", end, duration);
            self.end = None;
        }
        if self.enabled && !self.is_valid() {
            self.enabled = false;
        }
    }

    /// Loop length in seconds when valid
    pub fn length(&self) -> Option<f64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) if e > s => Some(e - s),
            _ => None,
        }
    }
}

/// Structural copy of the controller state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopState {
    pub region: LoopRegion,
    pub progression: TempoProgression,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopEvent {
    /// Bounds or the looping flag changed
    RegionChanged,
    /// A repetition finished; carries the new completed count
    Completed(u32),
    /// Progression (or an explicit reset) moved the tempo, in percent
    TempoChanged(f64),
}

#[derive(Debug, Clone)]
pub struct LoopController {
    region: LoopRegion,
    progression: TempoProgression,
    /// Live tempo in percent of the original
    current_tempo: f64,
    events: Vec<LoopEvent>,
}

impl Default for LoopController {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopController {
    pub fn new() -> Self {
        Self {
            region: LoopRegion::default(),
            progression: TempoProgression::default(),
            current_tempo: DEFAULT_ORIGINAL_TEMPO,
            events: Vec::new(),
        }
    }

    pub fn region(&self) -> &LoopRegion {
        &self.region
    }

    pub fn progression(&self) -> &TempoProgression {
        &self.progression
    }

    pub fn current_tempo(&self) -> f64 {
        self.current_tempo
    }

    pub fn is_looping(&self) -> bool {
        self.region.enabled && self.region.is_valid()
    }

    pub fn completed_count(&self) -> u32 {
        self.region.completed_count
    }

    /// Set the loop start; `time` must lie in `[0, duration)`
    ///
    /// Clears the end bound if it would no longer be after the start.
    pub fn set_loop_start(&mut self, time: f64, duration: f64) -> bool {
        if !(time.is_finite() && time >= 0.0 && time < duration) {
            log::warn!("Rejected loop start {} (duration {})", time, duration);
            return false;
        }
        self.region.start = Some(time);
        if self.region.end.is_some_and(|end| end <= time) {
            log::debug!("Loop start {} passes end, clearing end", time);
            self.region.end = None;
            self.disable_looping();
        }
        self.events.push(LoopEvent::RegionChanged);
        true
    }

    /// Set the loop end; `time` must lie in `(0, duration]`
    ///
    /// Clears the start bound if it would no longer be before the end.
    pub fn set_loop_end(&mut self, time: f64, duration: f64) -> bool {
        if !(time.is_finite() && time > 0.0 && time <= duration) {
            log::warn!("Rejected loop end {} (duration {})", time, duration);
            return false;
        }
        self.region.end = Some(time);
        if self.region.start.is_some_and(|start| time <= start) {
            log::debug!("Loop end {} precedes start, clearing start", time);
            self.region.start = None;
            self.disable_looping();
        }
        self.events.push(LoopEvent::RegionChanged);
        true
    }

    /// Clear both bounds, disable looping and reset all counters
    pub fn clear_loop(&mut self) {
        self.region = LoopRegion::default();
        self.progression.progress_counter = 0;
        self.events.push(LoopEvent::RegionChanged);
    }

    /// Enable or disable looping; enabling requires a valid region
    pub fn set_looping(&mut self, enabled: bool) -> bool {
        if enabled {
            if !self.region.is_valid() {
                log::warn!("Cannot enable looping without a valid region");
                return false;
            }
            if !self.region.enabled {
                self.region.enabled = true;
                self.events.push(LoopEvent::RegionChanged);
            }
        } else if self.region.enabled {
            self.disable_looping();
            self.events.push(LoopEvent::RegionChanged);
        }
        true
    }

    /// Flip the looping flag; returns the resulting state
    pub fn toggle_looping(&mut self) -> bool {
        let target = !self.region.enabled;
        self.set_looping(target);
        self.region.enabled
    }

    fn disable_looping(&mut self) {
        self.region.enabled = false;
        self.progression.progress_counter = 0;
    }

    /// Replace the progression settings, keeping the live counter
    pub fn set_progression(&mut self, mut progression: TempoProgression) {
        progression.progress_counter = if progression.enabled {
            self.progression.progress_counter
        } else {
            0
        };
        progression.sanitize();
        self.progression = progression;
    }

    /// Track the live tempo (percent) when speed is changed elsewhere
    pub fn sync_tempo(&mut self, tempo_percent: f64) {
        if tempo_percent.is_finite() {
            self.current_tempo = tempo_percent;
        }
    }

    /// Explicit user reset back to the original tempo
    pub fn reset_tempo(&mut self) {
        self.progression.progress_counter = 0;
        let original = self.progression.original_tempo;
        if self.current_tempo != original {
            self.current_tempo = original;
            self.events.push(LoopEvent::TempoChanged(original));
        }
    }

    /// Decide what to do with the position sampled this tick
    ///
    /// Returns the time to seek to, if any. Reaching the end counts a
    /// repetition and may step the tempo; landing before the start (after
    /// an external seek) simply jumps back into the region.
    pub fn check_boundary(&mut self, current_time: f64) -> Option<f64> {
        if !self.region.enabled {
            return None;
        }
        let (start, end) = match (self.region.start, self.region.end) {
            (Some(s), Some(e)) if e > s => (s, e),
            _ => return None,
        };

        if current_time >= end {
            self.region.completed_count += 1;
            self.events.push(LoopEvent::Completed(self.region.completed_count));

            if self.progression.enabled {
                self.progression.progress_counter += 1;
                if self.progression.progress_counter >= self.progression.loop_interval {
                    self.progression.progress_counter = 0;
                    self.apply_progression_step();
                }
            }
            Some(start)
        } else if current_time < start {
            Some(start)
        } else {
            None
        }
    }

    fn apply_progression_step(&mut self) {
        let next = self.progression.step(self.current_tempo);
        if next != self.current_tempo {
            log::debug!("Tempo progression {:.1}% -> {:.1}%", self.current_tempo, next);
            self.current_tempo = next;
            self.events.push(LoopEvent::TempoChanged(next));
        }
    }

    pub fn get_state(&self) -> LoopState {
        LoopState {
            region: self.region.clone(),
            progression: self.progression.clone(),
        }
    }

    /// Restore a structural copy, repairing a region that breaks the invariant
    pub fn set_state(&mut self, state: LoopState) {
        let LoopState { mut region, mut progression } = state;
        if let (Some(s), Some(e)) = (region.start, region.end) {
            if e <= s {
                log::warn!("Restored loop region has end {} <= start {}, dropping start", e, s);
                region.start = None;
            }
        }
        if region.enabled && !region.is_valid() {
            region.enabled = false;
        }
        progression.sanitize();
        self.region = region;
        self.progression = progression;
        self.events.push(LoopEvent::RegionChanged);
    }

    /// Drain pending events
    pub fn take_events(&mut self) -> Vec<LoopEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping(start: f64, end: f64, duration: f64) -> LoopController {
        let mut ctl = LoopController::new();
        assert!(ctl.set_loop_start(start, duration));
        assert!(ctl.set_loop_end(end, duration));
        assert!(ctl.set_looping(true));
        ctl.take_events();
        ctl
    }

    #[test]
    fn test_basic_loop_crossing() {
        let mut ctl = looping(30.0, 40.0, 120.0);
        assert_eq!(ctl.check_boundary(39.9), None);
        assert_eq!(ctl.check_boundary(40.1), Some(30.0));
        assert_eq!(ctl.completed_count(), 1);
        assert_eq!(ctl.take_events(), vec![LoopEvent::Completed(1)]);
    }

    #[test]
    fn test_end_before_start_clears_start() {
        let mut ctl = LoopController::new();
        assert!(ctl.set_loop_start(50.0, 120.0));
        assert!(ctl.set_loop_end(45.0, 120.0));
        assert_eq!(ctl.region().start, None);
        assert_eq!(ctl.region().end, Some(45.0));
    }

    #[test]
    fn test_start_after_end_clears_end() {
        let mut ctl = looping(10.0, 20.0, 60.0);
        assert!(ctl.set_loop_start(20.0, 60.0));
        assert_eq!(ctl.region().end, None);
        assert!(!ctl.region().enabled);
    }

    #[test]
    fn test_bounds_outside_track_rejected() {
        let mut ctl = LoopController::new();
        assert!(!ctl.set_loop_start(-1.0, 120.0));
        assert!(!ctl.set_loop_start(120.0, 120.0));
        assert!(!ctl.set_loop_end(0.0, 120.0));
        assert!(!ctl.set_loop_end(120.5, 120.0));
        assert!(!ctl.set_loop_start(f64::NAN, 120.0));
        assert!(ctl.set_loop_end(120.0, 120.0));
        assert_eq!(*ctl.region(), LoopRegion { end: Some(120.0), ..Default::default() });
    }

    /// Deterministic xorshift64 sequence in [0, 1)
    struct XorShift(u64);

    impl XorShift {
        fn next_unit(&mut self) -> f64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }
    }

    #[test]
    fn test_invariant_holds_under_arbitrary_setters() {
        for seed in 1..=20u64 {
            let mut rng = XorShift(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let mut ctl = LoopController::new();
            let duration = 1.0 + rng.next_unit() * 300.0;

            for step in 0..500 {
                // Some values land outside the track on purpose
                let t = (rng.next_unit() * 1.2 - 0.1) * duration;
                let roll = rng.next_unit();
                if roll < 0.4 {
                    ctl.set_loop_start(t, duration);
                } else if roll < 0.8 {
                    ctl.set_loop_end(t, duration);
                } else if roll < 0.9 {
                    ctl.toggle_looping();
                } else if roll < 0.95 {
                    // Hit the equal-bounds edge exactly
                    match (ctl.region().start, ctl.region().end) {
                        (Some(s), _) => {
                            ctl.set_loop_end(s, duration);
                        }
                        (None, Some(e)) => {
                            ctl.set_loop_start(e, duration);
                        }
                        (None, None) => {}
                    }
                } else {
                    ctl.clear_loop();
                }

                let region = ctl.region();
                if let (Some(s), Some(e)) = (region.start, region.end) {
                    assert!(e > s, "seed {} step {}: start {} end {}", seed, step, s, e);
                }
                if let Some(s) = region.start {
                    assert!((0.0..duration).contains(&s), "seed {} step {}: start {}", seed, step, s);
                }
                if let Some(e) = region.end {
                    assert!(e > 0.0 && e <= duration, "seed {} step {}: end {}", seed, step, e);
                }
                if region.enabled {
                    assert!(region.is_valid(), "seed {} step {}: enabled without valid region", seed, step);
                }
            }
        }
    }

    #[test]
    fn test_end_equal_to_start_clears_start() {
        let mut ctl = looping(10.0, 20.0, 60.0);
        assert!(ctl.set_loop_end(10.0, 60.0));
        assert_eq!(ctl.region().start, None);
        assert_eq!(ctl.region().end, Some(10.0));
        assert!(!ctl.region().enabled);
    }

    #[test]
    fn test_enable_requires_valid_region() {
        let mut ctl = LoopController::new();
        assert!(!ctl.set_looping(true));
        ctl.set_loop_start(5.0, 10.0);
        assert!(!ctl.toggle_looping());
        ctl.set_loop_end(8.0, 10.0);
        assert!(ctl.toggle_looping());
        assert!(ctl.is_looping());
        assert!(!ctl.toggle_looping());
    }

    #[test]
    fn test_before_start_jumps_back() {
        let mut ctl = looping(30.0, 40.0, 120.0);
        assert_eq!(ctl.check_boundary(12.0), Some(30.0));
        assert_eq!(ctl.completed_count(), 0);
    }

    #[test]
    fn test_disabled_loop_takes_no_action() {
        let mut ctl = looping(30.0, 40.0, 120.0);
        ctl.set_looping(false);
        assert_eq!(ctl.check_boundary(45.0), None);
        assert_eq!(ctl.check_boundary(10.0), None);
    }

    #[test]
    fn test_percentage_progression_every_second_loop() {
        let mut ctl = looping(30.0, 40.0, 120.0);
        ctl.set_progression(TempoProgression {
            enabled: true,
            increment_type: IncrementType::Percentage,
            increment_value: 10.0,
            loop_interval: 2,
            original_tempo: 100.0,
            ..Default::default()
        });

        ctl.check_boundary(40.0);
        assert_eq!(ctl.progression().progress_counter, 1);
        assert_eq!(ctl.current_tempo(), 100.0);

        ctl.check_boundary(40.0);
        assert_eq!(ctl.progression().progress_counter, 0);
        assert!((ctl.current_tempo() - 110.0).abs() < 1e-9);
        assert_eq!(
            ctl.take_events(),
            vec![LoopEvent::Completed(1), LoopEvent::Completed(2), LoopEvent::TempoChanged(ctl.current_tempo())]
        );
    }

    #[test]
    fn test_absolute_progression_normalizes_by_original_tempo() {
        let mut ctl = looping(1.0, 2.0, 10.0);
        ctl.set_progression(TempoProgression {
            enabled: true,
            increment_type: IncrementType::Absolute,
            increment_value: 6.0,
            loop_interval: 1,
            original_tempo: 120.0,
            ..Default::default()
        });
        ctl.check_boundary(2.0);
        assert!((ctl.current_tempo() - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_progression_never_exceeds_ceiling() {
        let mut ctl = looping(1.0, 2.0, 10.0);
        ctl.set_progression(TempoProgression {
            enabled: true,
            increment_value: 25.0,
            loop_interval: 3,
            max_tempo_percent: 150.0,
            ..Default::default()
        });

        let mut tempo_changes = 0;
        for i in 1..=30 {
            ctl.check_boundary(2.5);
            for event in ctl.take_events() {
                if let LoopEvent::TempoChanged(t) = event {
                    tempo_changes += 1;
                    assert!(t <= 150.0);
                    assert_eq!(i % 3, 0, "step fired on completion {}", i);
                }
            }
        }
        // 100 → 125 → 150, then clamped with no further events
        assert_eq!(tempo_changes, 2);
        assert_eq!(ctl.current_tempo(), 150.0);
    }

    #[test]
    fn test_disabling_resets_progress_counter() {
        let mut ctl = looping(1.0, 2.0, 10.0);
        ctl.set_progression(TempoProgression { enabled: true, loop_interval: 4, ..Default::default() });
        ctl.check_boundary(2.0);
        assert_eq!(ctl.progression().progress_counter, 1);
        ctl.set_looping(false);
        assert_eq!(ctl.progression().progress_counter, 0);
    }

    #[test]
    fn test_clear_loop_resets_counts() {
        let mut ctl = looping(1.0, 2.0, 10.0);
        ctl.set_progression(TempoProgression { enabled: true, loop_interval: 4, ..Default::default() });
        ctl.check_boundary(2.0);
        ctl.clear_loop();
        assert_eq!(*ctl.region(), LoopRegion::default());
        assert_eq!(ctl.progression().progress_counter, 0);
    }

    #[test]
    fn test_tempo_is_not_reset_implicitly() {
        let mut ctl = looping(1.0, 2.0, 10.0);
        ctl.set_progression(TempoProgression { enabled: true, loop_interval: 1, ..Default::default() });
        ctl.check_boundary(2.0);
        let stepped = ctl.current_tempo();
        ctl.clear_loop();
        assert_eq!(ctl.current_tempo(), stepped);

        ctl.take_events();
        ctl.reset_tempo();
        assert_eq!(ctl.current_tempo(), 100.0);
        assert_eq!(ctl.take_events(), vec![LoopEvent::TempoChanged(100.0)]);
    }

    #[test]
    fn test_state_roundtrip() {
        let mut ctl = looping(3.0, 7.5, 10.0);
        ctl.set_progression(TempoProgression {
            enabled: true,
            increment_type: IncrementType::Absolute,
            increment_value: 4.0,
            loop_interval: 2,
            max_tempo_percent: 180.0,
            original_tempo: 90.0,
            ..Default::default()
        });
        ctl.check_boundary(8.0);

        let state = ctl.get_state();
        let mut other = LoopController::new();
        other.set_state(state.clone());
        assert_eq!(other.get_state(), state);
    }

    #[test]
    fn test_set_state_repairs_bad_region() {
        let mut ctl = LoopController::new();
        ctl.set_state(LoopState {
            region: LoopRegion { start: Some(5.0), end: Some(2.0), enabled: true, completed_count: 0 },
            progression: TempoProgression { loop_interval: 0, ..Default::default() },
        });
        assert_eq!(ctl.region().start, None);
        assert!(!ctl.region().enabled);
        assert_eq!(ctl.progression().loop_interval, 1);
    }

    #[test]
    fn test_reset_returns_to_original_tempo() {
        let mut ctl = LoopController::new();
        ctl.set_progression(TempoProgression { original_tempo: 80.0, ..Default::default() });
        ctl.sync_tempo(120.0);
        ctl.take_events();

        ctl.reset_tempo();
        assert_eq!(ctl.current_tempo(), 80.0);
        assert_eq!(ctl.take_events(), vec![LoopEvent::TempoChanged(80.0)]);

        ctl.reset_tempo();
        assert!(ctl.take_events().is_empty());
    }

    #[test]
    fn test_retain_within_drops_bounds_past_end() {
        let mut region = LoopRegion { start: Some(10.0), end: Some(90.0), enabled: true, completed_count: 0 };
        region.retain_within(60.0);
        assert_eq!(region, LoopRegion { start: Some(10.0), ..Default::default() });

        let mut region = LoopRegion { start: Some(70.0), end: Some(90.0), enabled: true, completed_count: 0 };
        region.retain_within(60.0);
        assert_eq!(region, LoopRegion::default());

        let mut region = LoopRegion { start: Some(5.0), end: Some(60.0), enabled: true, completed_count: 0 };
        region.retain_within(60.0);
        assert!(region.enabled);
    }
}
