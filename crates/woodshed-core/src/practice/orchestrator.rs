//! Practice session orchestrator
//!
//! Wires the transport, the loop and pitch/tempo controllers, the practice
//! timer and the session store together. Controllers never call each other:
//! they queue typed events which [`Orchestrator::dispatch`] drains and routes,
//! so every cross-component effect happens here, in one place, in order.
//!
//! The host drives [`Orchestrator::tick`] every `poll_interval` while
//! [`Orchestrator::is_polling`] is true. A tick samples the position, lets the
//! loop controller decide on a seek, and reports the resulting position so
//! the waveform can be updated after any seek has been applied.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::config::PracticeDefaults;
use crate::timestretch::QualityMode;
use crate::types::{TrackBuffer, MAX_PITCH_SEMITONES, MIN_PITCH_SEMITONES};

use super::audio_core::AudioCore;
use super::collaborators::{PracticeListener, PracticeTimer, SessionStore, Transport};
use super::loop_controller::{LoopController, LoopEvent, TempoProgression};
use super::pitch_tempo::{PitchTempoController, PitchTempoEvent};
use super::session::SessionSnapshot;

/// Outcome of one poll tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Position after any seek this tick applied (seconds)
    pub position: f64,
    /// Loop restart target, when the tick jumped back
    pub seeked_to: Option<f64>,
    /// Playback ran off the end of the track and was stopped
    pub ended: bool,
}

/// Sample the position and apply the loop controller's decision
///
/// Only talks to the transport through [`Transport`], so a host with a
/// scheduled-callback primitive can call this at the exact boundary instead
/// of from a poll.
pub fn poll_boundary(transport: &mut dyn Transport, loops: &mut LoopController) -> Option<f64> {
    let now = transport.current_time();
    let target = loops.check_boundary(now)?;
    if transport.seek(target) {
        Some(target)
    } else {
        log::warn!("Loop restart seek to {:.3}s was rejected", target);
        None
    }
}

pub struct Orchestrator {
    audio: AudioCore,
    pitch_tempo: PitchTempoController,
    loops: LoopController,
    timer: Box<dyn PracticeTimer>,
    store: Option<Box<dyn SessionStore>>,
    listeners: Vec<Box<dyn PracticeListener>>,
    sync_with_timer: bool,
    poll_interval: Duration,
    track_id: Option<String>,
}

impl Orchestrator {
    pub fn new(audio: AudioCore, timer: Box<dyn PracticeTimer>, defaults: &PracticeDefaults) -> Self {
        let mut orchestrator = Self {
            audio,
            pitch_tempo: PitchTempoController::new(),
            loops: LoopController::new(),
            timer,
            store: None,
            listeners: Vec::new(),
            sync_with_timer: defaults.sync_with_timer,
            poll_interval: defaults.poll_interval(),
            track_id: None,
        };
        orchestrator.pitch_tempo.set_preserve_pitch(defaults.preserve_pitch);
        orchestrator.loops.set_progression(defaults.progression.clone());
        orchestrator.dispatch();
        orchestrator
    }

    /// Attach a store for saved loop sessions
    pub fn with_store(mut self, store: Box<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn PracticeListener>) {
        self.listeners.push(listener);
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    /// Load a track; `track_id` keys its saved sessions
    ///
    /// Any loop from the previous track is cleared. Speed, pitch and
    /// progression settings carry over.
    pub fn load(&mut self, buffer: TrackBuffer, track_id: &str) -> bool {
        self.pause_timer();
        self.loops.clear_loop();
        let loaded = self.audio.load_buffer(buffer, track_id);
        self.track_id = loaded.then(|| track_id.to_string());
        self.dispatch();
        loaded
    }

    pub fn play(&mut self, start_time: Option<f64>) -> bool {
        let playing = self.audio.play(start_time);
        if playing && self.sync_with_timer && !self.timer.is_running() {
            self.timer.start();
        }
        playing
    }

    pub fn pause(&mut self) -> bool {
        let paused = self.audio.pause();
        self.pause_timer();
        paused
    }

    pub fn stop(&mut self) -> bool {
        let stopped = self.audio.stop();
        self.pause_timer();
        stopped
    }

    pub fn seek(&mut self, time: f64) -> bool {
        self.audio.seek(time)
    }

    fn pause_timer(&mut self) {
        if self.sync_with_timer && self.timer.is_running() {
            self.timer.pause();
        }
    }

    /// One poll step; see the module docs
    pub fn tick(&mut self) -> TickReport {
        if !self.audio.is_playing() {
            return TickReport {
                position: self.audio.current_time(),
                seeked_to: None,
                ended: false,
            };
        }

        let seeked_to = poll_boundary(&mut self.audio, &mut self.loops);
        if let Some(target) = seeked_to {
            let region = self.loops.region().clone();
            let progression = self.loops.progression().clone();
            self.notify(|l| {
                l.on_seek_requested(target);
                l.on_loop_update(&region, &progression);
            });
        }
        self.dispatch();

        let duration = self.audio.duration();
        let ended = seeked_to.is_none()
            && !self.loops.is_looping()
            && duration > 0.0
            && self.audio.current_time() >= duration;
        if ended {
            log::debug!("Reached end of track");
            self.stop();
            self.notify(|l| l.on_playback_ended());
        }

        TickReport {
            position: self.audio.current_time(),
            seeked_to,
            ended,
        }
    }

    /// True exactly while playing; hosts schedule ticks only then
    pub fn is_polling(&self) -> bool {
        self.audio.is_playing()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    // ─────────────────────────────────────────────────────────────
    // Speed, pitch, sound
    // ─────────────────────────────────────────────────────────────

    /// Set the speed multiplier; returns the applied (clamped) value
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        let applied = self.pitch_tempo.set_speed(speed);
        self.dispatch();
        applied
    }

    pub fn adjust_speed(&mut self, delta: f64) -> f64 {
        let applied = self.pitch_tempo.adjust_speed(delta);
        self.dispatch();
        applied
    }

    /// Set the explicit transposition; returns the applied (clamped) value
    pub fn set_pitch(&mut self, semitones: f64) -> f64 {
        let applied = self.pitch_tempo.set_pitch(semitones);
        self.dispatch();
        applied
    }

    /// Shift the transposition by `delta` semitones (negative lowers)
    pub fn shift_pitch(&mut self, delta: f64) -> f64 {
        let applied = self.pitch_tempo.increase_pitch(delta);
        self.dispatch();
        applied
    }

    pub fn apply_speed_preset(&mut self, index: usize) -> Option<f64> {
        let applied = self.pitch_tempo.apply_speed_preset(index);
        self.dispatch();
        applied
    }

    pub fn apply_pitch_preset(&mut self, index: usize) -> Option<f64> {
        let applied = self.pitch_tempo.apply_pitch_preset(index);
        self.dispatch();
        applied
    }

    pub fn set_preserve_pitch(&mut self, preserve: bool) {
        self.pitch_tempo.set_preserve_pitch(preserve);
        self.dispatch();
    }

    /// Switch the stretch quality
    ///
    /// A failed rebuild leaves no track loaded, so the track id and loop go
    /// with it.
    pub fn set_quality(&mut self, mode: QualityMode) -> bool {
        if self.audio.set_quality(mode) {
            return true;
        }
        if let Some(track_id) = self.track_id.take() {
            log::warn!("{:?} was unloaded by a failed quality switch", track_id);
        }
        self.pause_timer();
        self.loops.clear_loop();
        self.dispatch();
        false
    }

    pub fn set_volume(&mut self, db: f64) -> f64 {
        self.audio.set_volume(db)
    }

    // ─────────────────────────────────────────────────────────────
    // Looping
    // ─────────────────────────────────────────────────────────────

    pub fn set_loop_start(&mut self, time: f64) -> bool {
        let accepted = self.loops.set_loop_start(time, self.audio.duration());
        self.dispatch();
        accepted
    }

    pub fn set_loop_end(&mut self, time: f64) -> bool {
        let accepted = self.loops.set_loop_end(time, self.audio.duration());
        self.dispatch();
        accepted
    }

    /// Loop start at the current position
    pub fn set_loop_here_start(&mut self) -> bool {
        let now = self.audio.current_time();
        self.set_loop_start(now)
    }

    /// Loop end at the current position
    pub fn set_loop_here_end(&mut self) -> bool {
        let now = self.audio.current_time();
        self.set_loop_end(now)
    }

    pub fn set_looping(&mut self, enabled: bool) -> bool {
        let accepted = self.loops.set_looping(enabled);
        self.dispatch();
        accepted
    }

    /// Flip looping; returns whether looping is now on
    pub fn toggle_loop(&mut self) -> bool {
        let enabled = self.loops.toggle_looping();
        self.dispatch();
        enabled
    }

    pub fn clear_loop(&mut self) {
        self.loops.clear_loop();
        self.dispatch();
    }

    pub fn set_progression(&mut self, progression: TempoProgression) {
        self.loops.set_progression(progression);
        let region = self.loops.region().clone();
        let progression = self.loops.progression().clone();
        self.notify(|l| l.on_loop_update(&region, &progression));
    }

    /// Back to the original tempo and a fresh progression count
    pub fn reset_tempo(&mut self) {
        self.loops.reset_tempo();
        // An unchanged tempo emits nothing, but speed may still be off
        self.pitch_tempo.set_speed(self.loops.current_tempo() / 100.0);
        self.dispatch();
    }

    // ─────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────

    /// Snapshot of the session-relevant state
    pub fn get_state(&self) -> SessionSnapshot {
        let region = self.loops.region();
        SessionSnapshot {
            speed: self.pitch_tempo.speed(),
            pitch_shift_semitones: self.pitch_tempo.pitch(),
            loop_start: region.start,
            loop_end: region.end,
            loop_enabled: region.enabled,
            tempo_progression: self.loops.progression().clone(),
        }
    }

    /// Restore a snapshot (the repetition count starts over)
    ///
    /// Loop bounds that do not fit the loaded track are dropped.
    pub fn set_state(&mut self, snapshot: SessionSnapshot) {
        let mut state = snapshot.loop_state();
        state.region.retain_within(self.audio.duration());
        self.loops.set_state(state);
        self.dispatch();
        self.pitch_tempo.set_speed(snapshot.speed);
        self.pitch_tempo.set_pitch(snapshot.pitch_shift_semitones);
        self.dispatch();
    }

    /// Save the current state under the loaded track's id
    pub fn save_session(&mut self) -> Result<()> {
        let snapshot = self.get_state();
        let track_id = self.track_id.clone().ok_or_else(|| anyhow!("No track loaded"))?;
        let store = self.store.as_mut().ok_or_else(|| anyhow!("No session store attached"))?;
        store
            .save_loop_session(&track_id, &snapshot)
            .with_context(|| format!("Failed to save session for {:?}", track_id))?;
        log::info!("Saved loop session for {:?}", track_id);
        Ok(())
    }

    /// Saved sessions for the loaded track
    pub fn sessions(&self) -> Result<Vec<SessionSnapshot>> {
        let track_id = self.track_id.as_deref().ok_or_else(|| anyhow!("No track loaded"))?;
        let store = self.store.as_ref().ok_or_else(|| anyhow!("No session store attached"))?;
        store.loop_sessions(track_id)
    }

    /// Restore the saved session at `index`
    pub fn recall_session(&mut self, index: usize) -> Result<()> {
        let snapshot = self
            .sessions()?
            .into_iter()
            .nth(index)
            .ok_or_else(|| anyhow!("No saved session at index {}", index))?;
        self.set_state(snapshot);
        log::debug!("Recalled loop session {}", index);
        Ok(())
    }

    pub fn delete_session(&mut self, index: usize) -> Result<()> {
        let track_id = self.track_id.clone().ok_or_else(|| anyhow!("No track loaded"))?;
        let store = self.store.as_mut().ok_or_else(|| anyhow!("No session store attached"))?;
        store
            .delete_loop_session(&track_id, index)
            .with_context(|| format!("Failed to delete session {} for {:?}", index, track_id))
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn audio(&self) -> &AudioCore {
        &self.audio
    }

    pub fn pitch_tempo(&self) -> &PitchTempoController {
        &self.pitch_tempo
    }

    pub fn loops(&self) -> &LoopController {
        &self.loops
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track_id.as_deref()
    }

    pub fn current_time(&self) -> f64 {
        self.audio.current_time()
    }

    pub fn duration(&self) -> f64 {
        self.audio.duration()
    }

    /// Stop everything and release the audio device
    pub fn shutdown(&mut self) {
        self.pause_timer();
        self.audio.destroy();
    }

    // ─────────────────────────────────────────────────────────────
    // Event routing
    // ─────────────────────────────────────────────────────────────

    /// Drain controller events until both queues are quiet
    fn dispatch(&mut self) {
        loop {
            let loop_events = self.loops.take_events();
            let knob_events = self.pitch_tempo.take_events();
            if loop_events.is_empty() && knob_events.is_empty() {
                break;
            }

            for event in loop_events {
                match event {
                    LoopEvent::RegionChanged => {
                        let region = self.loops.region().clone();
                        let progression = self.loops.progression().clone();
                        self.notify(|l| l.on_loop_update(&region, &progression));
                    }
                    LoopEvent::Completed(count) => self.notify(|l| l.on_loop_complete(count)),
                    LoopEvent::TempoChanged(tempo) => {
                        self.pitch_tempo.set_speed(tempo / 100.0);
                        self.notify(|l| l.on_tempo_change(tempo));
                    }
                }
            }

            for event in knob_events {
                match event {
                    PitchTempoEvent::SpeedChanged(speed) => {
                        self.audio.set_playback_rate(speed);
                        self.loops.sync_tempo(speed * 100.0);
                        self.push_pitch();
                        self.notify(|l| l.on_speed_change(speed));
                    }
                    PitchTempoEvent::PitchChanged(semitones) => {
                        self.push_pitch();
                        self.notify(|l| l.on_pitch_change(semitones));
                    }
                    PitchTempoEvent::PreservePitchChanged(_) => self.push_pitch(),
                }
            }
        }
    }

    /// Send the effective transposition to the pitch stage
    ///
    /// The stage is bypassed whenever the explicit shift is zero, even if
    /// turning pitch preservation off adds a tempo-derived shift. That shift
    /// is then reported by `combined_pitch` but not heard.
    fn push_pitch(&mut self) {
        let explicit = self.pitch_tempo.pitch();
        let combined = self.pitch_tempo.combined_pitch();
        if explicit == 0.0 {
            if combined != 0.0 {
                log::debug!(
                    "Pitch stage bypassed; implicit {:+.2} st from speed is not applied",
                    combined
                );
            }
            self.audio.set_pitch_shift(0.0);
        } else {
            self.audio
                .set_pitch_shift(combined.clamp(MIN_PITCH_SEMITONES, MAX_PITCH_SEMITONES));
        }
    }

    fn notify(&mut self, mut f: impl FnMut(&mut dyn PracticeListener)) {
        for listener in &mut self.listeners {
            f(listener.as_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::audio::OfflineBackend;
    use crate::config::AudioCoreConfig;
    use crate::practice::{IncrementType, LoopRegion, MemorySessionStore};
    use crate::types::SampleBuffer;

    #[derive(Debug, Clone, PartialEq)]
    enum Heard {
        LoopUpdate,
        Complete(u32),
        Tempo(f64),
        Seek(f64),
        Speed(f64),
        Pitch(f64),
        Ended,
    }

    struct Recorder(Arc<Mutex<Vec<Heard>>>);

    impl PracticeListener for Recorder {
        fn on_loop_update(&mut self, _: &LoopRegion, _: &TempoProgression) {
            self.0.lock().unwrap().push(Heard::LoopUpdate);
        }
        fn on_loop_complete(&mut self, count: u32) {
            self.0.lock().unwrap().push(Heard::Complete(count));
        }
        fn on_tempo_change(&mut self, tempo_percent: f64) {
            self.0.lock().unwrap().push(Heard::Tempo(tempo_percent));
        }
        fn on_seek_requested(&mut self, time: f64) {
            self.0.lock().unwrap().push(Heard::Seek(time));
        }
        fn on_speed_change(&mut self, speed: f64) {
            self.0.lock().unwrap().push(Heard::Speed(speed));
        }
        fn on_pitch_change(&mut self, semitones: f64) {
            self.0.lock().unwrap().push(Heard::Pitch(semitones));
        }
        fn on_playback_ended(&mut self) {
            self.0.lock().unwrap().push(Heard::Ended);
        }
    }

    #[derive(Default)]
    struct FlagTimer(Arc<Mutex<(bool, u32)>>);

    impl PracticeTimer for FlagTimer {
        fn start(&mut self) {
            let mut state = self.0.lock().unwrap();
            state.0 = true;
            state.1 += 1;
        }
        fn pause(&mut self) {
            self.0.lock().unwrap().0 = false;
        }
        fn is_running(&self) -> bool {
            self.0.lock().unwrap().0
        }
    }

    struct Rig {
        orchestrator: Orchestrator,
        backend: OfflineBackend,
        heard: Arc<Mutex<Vec<Heard>>>,
        timer: Arc<Mutex<(bool, u32)>>,
    }

    fn rig(defaults: PracticeDefaults) -> Rig {
        let backend = OfflineBackend::new(48000);
        let audio = AudioCore::new(Box::new(backend.clone()), AudioCoreConfig::default());
        let timer = FlagTimer::default();
        let timer_state = Arc::clone(&timer.0);
        let mut orchestrator = Orchestrator::new(audio, Box::new(timer), &defaults)
            .with_store(Box::new(MemorySessionStore::new()));
        let heard = Arc::new(Mutex::new(Vec::new()));
        orchestrator.add_listener(Box::new(Recorder(Arc::clone(&heard))));
        Rig {
            orchestrator,
            backend,
            heard,
            timer: timer_state,
        }
    }

    fn track(seconds: f64) -> TrackBuffer {
        let len = (seconds * 1000.0) as usize;
        SampleBuffer::new(1000, vec![vec![0.2; len]]).unwrap().into_shared()
    }

    fn loaded(seconds: f64) -> Rig {
        let mut rig = rig(PracticeDefaults::default());
        assert!(rig.orchestrator.load(track(seconds), "track-1"));
        rig
    }

    #[test]
    fn test_tick_restarts_loop() {
        let mut rig = loaded(120.0);
        let o = &mut rig.orchestrator;
        assert!(o.set_loop_start(30.0));
        assert!(o.set_loop_end(40.0));
        assert!(o.set_looping(true));
        assert!(o.play(Some(39.5)));
        rig.heard.lock().unwrap().clear();

        rig.backend.advance(0.25);
        let report = o.tick();
        assert_eq!(report.seeked_to, None);

        rig.backend.advance(0.3);
        let report = o.tick();
        assert_eq!(report.seeked_to, Some(30.0));
        assert!((report.position - 30.0).abs() < 1e-9);
        assert_eq!(o.loops().completed_count(), 1);

        let heard = rig.heard.lock().unwrap();
        assert!(heard.contains(&Heard::Seek(30.0)));
        assert!(heard.contains(&Heard::Complete(1)));
    }

    #[test]
    fn test_tick_before_loop_start_jumps_in() {
        let mut rig = loaded(120.0);
        let o = &mut rig.orchestrator;
        o.set_loop_start(30.0);
        o.set_loop_end(40.0);
        o.set_looping(true);
        o.play(Some(35.0));
        o.seek(10.0);

        let report = o.tick();
        assert_eq!(report.seeked_to, Some(30.0));
        assert_eq!(o.loops().completed_count(), 0);
    }

    #[test]
    fn test_progression_drives_playback_rate() {
        let mut rig = loaded(60.0);
        let o = &mut rig.orchestrator;
        o.set_progression(TempoProgression {
            enabled: true,
            increment_type: IncrementType::Percentage,
            increment_value: 10.0,
            loop_interval: 2,
            ..Default::default()
        });
        o.set_loop_start(1.0);
        o.set_loop_end(2.0);
        o.set_looping(true);
        o.play(Some(1.0));

        rig.backend.advance(1.01);
        o.tick();
        assert_eq!(o.audio().state().playback_rate, 1.0);

        rig.backend.advance(1.01);
        o.tick();
        assert!((o.audio().state().playback_rate - 1.1).abs() < 1e-9);
        assert!((o.pitch_tempo().speed() - 1.1).abs() < 1e-9);
        assert!(rig.heard.lock().unwrap().iter().any(|h| matches!(h, Heard::Tempo(t) if (t - 110.0).abs() < 1e-9)));
    }

    #[test]
    fn test_speed_change_syncs_loop_tempo() {
        let mut rig = loaded(60.0);
        let o = &mut rig.orchestrator;
        assert_eq!(o.set_speed(0.75), 0.75);
        assert_eq!(o.loops().current_tempo(), 75.0);
        assert_eq!(o.audio().state().playback_rate, 0.75);

        o.reset_tempo();
        assert_eq!(o.pitch_tempo().speed(), 1.0);
        assert_eq!(o.audio().state().playback_rate, 1.0);
    }

    #[test]
    fn test_adversarial_knobs_stay_in_range() {
        let mut rig = loaded(10.0);
        let o = &mut rig.orchestrator;
        assert_eq!(o.set_speed(5.0), 4.0);
        assert_eq!(o.adjust_speed(100.0), 4.0);
        assert_eq!(o.adjust_speed(-100.0), 0.25);
        assert_eq!(o.set_pitch(-30.0), -24.0);
        assert_eq!(o.shift_pitch(1000.0), 24.0);
        assert_eq!(o.audio().state().playback_rate, 0.25);
        assert_eq!(o.audio().state().pitch_shift_semitones, 24.0);
    }

    #[test]
    fn test_implicit_pitch_dropped_when_explicit_is_zero() {
        let mut rig = loaded(10.0);
        let o = &mut rig.orchestrator;
        o.set_preserve_pitch(false);
        o.set_speed(2.0);
        assert_eq!(o.pitch_tempo().combined_pitch(), 12.0);
        assert_eq!(o.audio().state().pitch_shift_semitones, 0.0);

        o.set_pitch(1.0);
        assert!((o.audio().state().pitch_shift_semitones - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_timer_follows_playback() {
        let mut rig = loaded(10.0);
        let o = &mut rig.orchestrator;
        assert!(o.play(None));
        assert_eq!(*rig.timer.lock().unwrap(), (true, 1));
        o.pause();
        assert!(!rig.timer.lock().unwrap().0);
        o.play(None);
        o.stop();
        assert_eq!(*rig.timer.lock().unwrap(), (false, 2));
    }

    #[test]
    fn test_timer_untouched_without_sync() {
        let mut rig = rig(PracticeDefaults {
            sync_with_timer: false,
            ..Default::default()
        });
        rig.orchestrator.load(track(10.0), "track-1");
        rig.orchestrator.play(None);
        assert_eq!(*rig.timer.lock().unwrap(), (false, 0));
    }

    #[test]
    fn test_end_of_track_stops() {
        let mut rig = loaded(1.0);
        let o = &mut rig.orchestrator;
        o.play(None);
        assert!(o.is_polling());
        rig.backend.advance(1.2);

        let report = o.tick();
        assert!(report.ended);
        assert!(!o.is_polling());
        assert_eq!(o.current_time(), 0.0);
        assert!(rig.heard.lock().unwrap().contains(&Heard::Ended));
        assert!(!rig.timer.lock().unwrap().0);
    }

    #[test]
    fn test_tick_when_paused_is_inert() {
        let mut rig = loaded(10.0);
        let o = &mut rig.orchestrator;
        o.seek(4.0);
        let report = o.tick();
        assert_eq!(
            report,
            TickReport {
                position: 4.0,
                seeked_to: None,
                ended: false
            }
        );
    }

    #[test]
    fn test_loop_here_uses_current_position() {
        let mut rig = loaded(60.0);
        let o = &mut rig.orchestrator;
        o.seek(12.0);
        assert!(o.set_loop_here_start());
        o.seek(18.0);
        assert!(o.set_loop_here_end());
        assert_eq!(o.loops().region().start, Some(12.0));
        assert_eq!(o.loops().region().end, Some(18.0));
        assert!(o.toggle_loop());
        assert!(!o.toggle_loop());
    }

    #[test]
    fn test_load_clears_loop() {
        let mut rig = loaded(60.0);
        let o = &mut rig.orchestrator;
        o.set_loop_start(5.0);
        o.set_loop_end(9.0);
        o.set_looping(true);
        assert!(o.load(track(30.0), "track-2"));
        assert_eq!(o.loops().region().start, None);
        assert!(!o.loops().is_looping());
        assert_eq!(o.track_id(), Some("track-2"));
    }

    #[test]
    fn test_state_round_trip() {
        let mut rig = loaded(120.0);
        let o = &mut rig.orchestrator;
        o.set_speed(0.8);
        o.set_pitch(-3.0);
        o.set_loop_start(30.0);
        o.set_loop_end(40.0);
        o.set_looping(true);
        let first = o.get_state();

        o.set_state(first.clone());
        assert_eq!(o.get_state(), first);
    }

    #[test]
    fn test_restored_loop_past_track_end_is_dropped() {
        let mut rig = loaded(60.0);
        let o = &mut rig.orchestrator;
        o.set_state(SessionSnapshot {
            loop_start: Some(10.0),
            loop_end: Some(90.0),
            loop_enabled: true,
            ..Default::default()
        });
        assert_eq!(o.loops().region().start, Some(10.0));
        assert_eq!(o.loops().region().end, None);
        assert!(!o.loops().is_looping());

        o.play(Some(55.0));
        rig.backend.advance(10.0);
        let report = o.tick();
        assert!(report.ended);
        assert!(!o.is_polling());
    }

    #[test]
    fn test_reset_tempo_uses_original_tempo() {
        let mut rig = loaded(60.0);
        let o = &mut rig.orchestrator;
        o.set_progression(TempoProgression {
            original_tempo: 80.0,
            ..Default::default()
        });
        o.set_speed(1.2);
        o.reset_tempo();
        assert_eq!(o.loops().current_tempo(), 80.0);
        assert!((o.pitch_tempo().speed() - 0.8).abs() < 1e-9);
        assert!((o.audio().state().playback_rate - 0.8).abs() < 1e-9);
        assert!(rig.heard.lock().unwrap().contains(&Heard::Tempo(80.0)));
    }

    #[test]
    fn test_failed_quality_switch_forgets_track() {
        let backend = OfflineBackend::new(48000);
        let config = AudioCoreConfig {
            ready_timeout_ms: 50,
            ..Default::default()
        };
        let audio = AudioCore::new(Box::new(backend.clone()), config);
        let mut o = Orchestrator::new(audio, Box::new(FlagTimer::default()), &PracticeDefaults::default())
            .with_store(Box::new(MemorySessionStore::new()));
        assert!(o.load(track(60.0), "track-1"));
        o.set_loop_start(5.0);
        o.set_loop_end(9.0);
        o.set_looping(true);

        backend.stall(true);
        assert!(!o.set_quality(QualityMode::High));
        assert_eq!(o.track_id(), None);
        assert!(!o.loops().is_looping());
        assert_eq!(o.loops().region().start, None);
        assert!(o.save_session().is_err());
    }

    #[test]
    fn test_sessions_save_recall_delete() {
        let mut rig = loaded(120.0);
        let o = &mut rig.orchestrator;
        o.set_speed(0.5);
        o.set_loop_start(10.0);
        o.set_loop_end(20.0);
        o.save_session().unwrap();

        o.set_speed(1.0);
        o.clear_loop();
        o.recall_session(0).unwrap();
        assert_eq!(o.pitch_tempo().speed(), 0.5);
        assert_eq!(o.loops().region().start, Some(10.0));
        assert_eq!(o.audio().state().playback_rate, 0.5);

        assert!(o.recall_session(3).is_err());
        o.delete_session(0).unwrap();
        assert!(o.sessions().unwrap().is_empty());
    }

    #[test]
    fn test_sessions_need_track() {
        let mut rig = rig(PracticeDefaults::default());
        assert!(rig.orchestrator.save_session().is_err());
        assert!(rig.orchestrator.sessions().is_err());
    }

    #[test]
    fn test_no_track_transport_fails() {
        let mut rig = rig(PracticeDefaults::default());
        let o = &mut rig.orchestrator;
        assert!(!o.play(None));
        assert!(!o.set_loop_start(1.0));
        assert!(!o.is_polling());
    }
}
