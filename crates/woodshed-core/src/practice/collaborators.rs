//! Interfaces to the world outside the engine
//!
//! The orchestrator is handed these at construction; nothing here is looked
//! up globally.

use super::loop_controller::{LoopRegion, TempoProgression};
use super::session::SessionSnapshot;

/// Playback position access used by the poll tick
///
/// The poll loop only reads the position and requests seeks through this
/// trait, so a host with a scheduled-callback primitive can drive boundary
/// checks without changing the loop logic.
pub trait Transport {
    fn current_time(&self) -> f64;
    fn seek(&mut self, time: f64) -> bool;
    fn is_playing(&self) -> bool;
    fn duration(&self) -> f64;
}

/// External practice timer
///
/// Started when playback starts and paused with it when `sync_with_timer` is
/// set. The engine never reads or writes the timer's elapsed time.
pub trait PracticeTimer {
    fn start(&mut self);
    fn pause(&mut self);
    fn is_running(&self) -> bool;
}

/// Persistent storage for saved loop sessions
///
/// `track_id` is opaque to the engine (a file name, a media id, ...).
pub trait SessionStore {
    fn save_loop_session(&mut self, track_id: &str, snapshot: &SessionSnapshot) -> anyhow::Result<()>;
    fn loop_sessions(&self, track_id: &str) -> anyhow::Result<Vec<SessionSnapshot>>;
    fn delete_loop_session(&mut self, track_id: &str, index: usize) -> anyhow::Result<()>;
}

/// Subscriber for engine notifications
///
/// Every method has an empty default so implementors pick what they need.
#[allow(unused_variables)]
pub trait PracticeListener {
    /// Loop bounds, flag, count or progression changed
    fn on_loop_update(&mut self, region: &LoopRegion, progression: &TempoProgression) {}
    fn on_loop_complete(&mut self, count: u32) {}
    /// Progression moved the tempo (percent of original)
    fn on_tempo_change(&mut self, tempo_percent: f64) {}
    /// The engine jumped playback to `time`
    fn on_seek_requested(&mut self, time: f64) {}
    fn on_speed_change(&mut self, speed: f64) {}
    fn on_pitch_change(&mut self, semitones: f64) {}
    /// Playback ran off the end of the track while not looping
    fn on_playback_ended(&mut self) {}
}
