//! Transport and live graph owner
//!
//! `AudioCore` is the only component that talks to the audio thread. It
//! builds the [`PracticeGraph`], hands it to an [`AudioBackend`], and from
//! then on controls it through the command queue. Playback position is
//! derived from the engine clock rather than queried from the graph:
//!
//! ```text
//! playing: offset + (clock_now − clock_at_start) × rate   (clamped to duration)
//! paused:  stored current_time
//! ```
//!
//! Every public operation reports failure with a plain `bool` (or returns the
//! clamped value) and logs the cause; nothing here panics or propagates an
//! error to the caller.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use basedrop::Owned;
use crossbeam::channel::{Receiver, RecvTimeoutError};

use crate::audio::{AudioBackend, AudioError, AudioResult, BackendState, CommandSender};
use crate::config::AudioCoreConfig;
use crate::engine::{command_channel, gc_handle, EngineClock, EngineCommand, GrainSource, PracticeGraph};
use crate::timestretch::QualityMode;
use crate::types::{
    db_to_gain, TrackBuffer, MAX_PITCH_SEMITONES, MAX_PLAYBACK_RATE, MAX_VOLUME_DB,
    MIN_PITCH_SEMITONES, MIN_PLAYBACK_RATE, MIN_VOLUME_DB,
};

use super::collaborators::Transport;

/// First delay between backend start attempts; doubles each retry
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Ready acknowledgements buffered between graph and control side
const READY_CHANNEL_CAPACITY: usize = 4;

/// The loaded track
#[derive(Clone)]
pub struct Track {
    pub buffer: TrackBuffer,
    /// Duration in seconds
    pub duration: f64,
    pub label: String,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("duration", &self.duration)
            .field("label", &self.label)
            .finish()
    }
}

/// Transport state owned by `AudioCore`
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Position while paused (seconds)
    pub current_time: f64,
    /// Position the current play segment started from (seconds)
    pub start_offset: f64,
    pub playback_rate: f64,
    pub pitch_shift_semitones: f64,
    pub volume_db: f64,
    pub quality: QualityMode,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            start_offset: 0.0,
            playback_rate: 1.0,
            pitch_shift_semitones: 0.0,
            volume_db: 0.0,
            quality: QualityMode::default(),
        }
    }
}

pub struct AudioCore {
    backend: Box<dyn AudioBackend>,
    config: AudioCoreConfig,
    sender: Option<CommandSender>,
    ready_rx: Option<Receiver<u64>>,
    clock: Arc<EngineClock>,
    initialized: bool,
    destroyed: bool,
    track: Option<Track>,
    state: PlaybackState,
    /// Engine clock (seconds) when the current play segment started
    clock_at_start: f64,
    /// Bumped by every load and stop; stale ready acks are ignored
    generation: u64,
}

impl AudioCore {
    pub fn new(backend: Box<dyn AudioBackend>, config: AudioCoreConfig) -> Self {
        let state = PlaybackState {
            volume_db: config.volume_db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB),
            quality: config.quality,
            ..Default::default()
        };
        Self {
            backend,
            config,
            sender: None,
            ready_rx: None,
            clock: Arc::new(EngineClock::default()),
            initialized: false,
            destroyed: false,
            track: None,
            state,
            clock_at_start: 0.0,
            generation: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Build the graph and start the backend
    ///
    /// Idempotent. Retries a failing backend with exponential backoff for up
    /// to `init_retry_window`; returns `false` if it never comes up.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return true;
        }
        if self.destroyed {
            log::warn!("AudioCore::initialize called after destroy");
            return false;
        }
        match self.start_backend() {
            Ok(()) => {
                self.initialized = true;
                log::info!("Audio engine initialized at {} Hz", self.backend.sample_rate());
                true
            }
            Err(e) => {
                log::error!("Audio engine failed to initialize: {}", e);
                false
            }
        }
    }

    fn start_backend(&mut self) -> AudioResult<()> {
        let window = self.config.init_retry_window();
        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let sample_rate = self.backend.sample_rate();
            let clock = Arc::new(EngineClock::new(sample_rate));
            let (ready_tx, ready_rx) = crossbeam::channel::bounded(READY_CHANNEL_CAPACITY);
            let (command_tx, command_rx) = command_channel();
            let graph = PracticeGraph::new(sample_rate, Arc::clone(&clock), ready_tx);

            match self.backend.start(graph, command_rx) {
                Ok(()) => {
                    self.clock = clock;
                    self.ready_rx = Some(ready_rx);
                    self.sender = Some(CommandSender::new(command_tx));
                    self.push_parameters();
                    return Ok(());
                }
                Err(e) => {
                    if started.elapsed() + backoff > window {
                        log::warn!("Last backend start attempt failed: {}", e);
                        return Err(AudioError::StartupTimeout(window.as_millis() as u64));
                    }
                    log::warn!("Audio backend start failed ({}), retrying in {:?}", e, backoff);
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }
    }

    /// Send the stored parameters to a freshly started graph
    fn push_parameters(&mut self) {
        let rate = self.state.playback_rate;
        let pitch = self.state.pitch_shift_semitones;
        let gain = db_to_gain(self.state.volume_db);
        self.send(EngineCommand::SetRate(rate));
        self.send(EngineCommand::SetPitch(pitch));
        self.send(EngineCommand::SetGain(gain));
    }

    /// Stop playback, unload the source and close the backend
    ///
    /// Safe to call repeatedly; also runs on drop.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop();
        if self.track.take().is_some() {
            self.send(EngineCommand::UnloadSource);
            self.backend.flush_commands();
        }
        self.backend.close();
        self.sender = None;
        self.ready_rx = None;
        self.initialized = false;
        self.destroyed = true;
        log::info!("Audio engine destroyed");
    }

    // ─────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────

    /// Replace the loaded track
    ///
    /// Stops playback, retires the previous source and wires a new grain
    /// source for the current quality mode, waiting for the graph to
    /// acknowledge it. On failure nothing is loaded and no source is wired.
    pub fn load_buffer(&mut self, buffer: TrackBuffer, label: &str) -> bool {
        self.generation += 1;
        let generation = self.generation;

        if !self.initialize() {
            return false;
        }

        self.halt_source();
        self.unload_source();
        self.state.current_time = 0.0;
        self.state.start_offset = 0.0;

        if buffer.is_empty() {
            log::error!("Cannot load {:?}: {}", label, AudioError::InvalidBuffer("no frames".into()));
            return false;
        }

        match self.wire_source(buffer.clone(), generation) {
            Ok(()) => {
                let duration = buffer.duration();
                log::info!(
                    "Loaded {:?}: {:.2}s, {} ch @ {} Hz",
                    label,
                    duration,
                    buffer.channel_count(),
                    buffer.sample_rate()
                );
                self.track = Some(Track {
                    buffer,
                    duration,
                    label: label.to_string(),
                });
                true
            }
            Err(e) => {
                log::error!("Failed to load {:?}: {}", label, e);
                self.send(EngineCommand::UnloadSource);
                self.backend.flush_commands();
                false
            }
        }
    }

    /// Build a source, queue it and wait for the graph's acknowledgement
    fn wire_source(&mut self, buffer: TrackBuffer, generation: u64) -> AudioResult<()> {
        let source = GrainSource::new(buffer, self.backend.sample_rate(), self.state.quality);
        let source = Owned::new(&gc_handle(), source);

        let sender = self.sender.as_mut().ok_or(AudioError::NotStarted)?;
        sender.try_send(EngineCommand::LoadSource { source, generation })?;
        self.backend.flush_commands();

        self.wait_ready(generation)
    }

    fn wait_ready(&self, generation: u64) -> AudioResult<()> {
        let rx = self.ready_rx.as_ref().ok_or(AudioError::NotStarted)?;
        let deadline = Instant::now() + self.config.ready_timeout();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(acked) if acked == generation => return Ok(()),
                Ok(stale) => {
                    log::debug!("Ignoring stale source ack {} (waiting for {})", stale, generation);
                }
                Err(RecvTimeoutError::Timeout) => return Err(AudioError::ReadyTimeout),
                Err(RecvTimeoutError::Disconnected) => return Err(AudioError::NotStarted),
            }
        }
    }

    fn unload_source(&mut self) {
        if self.track.take().is_some() {
            self.send(EngineCommand::UnloadSource);
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    /// Start playback, from `start_time` if given, else from the stored position
    pub fn play(&mut self, start_time: Option<f64>) -> bool {
        let Some(duration) = self.track.as_ref().map(|t| t.duration) else {
            log::warn!("play: no track loaded");
            return false;
        };

        if self.backend.state() == BackendState::Suspended {
            if let Err(e) = self.backend.resume() {
                log::error!("play: failed to resume audio output: {}", e);
                return false;
            }
        }

        if self.state.is_playing && start_time.is_none() {
            return true;
        }

        let mut offset = start_time
            .filter(|t| t.is_finite())
            .unwrap_or(self.state.current_time)
            .clamp(0.0, duration);
        if offset >= duration {
            offset = 0.0;
        }

        self.start_source_at(offset);
        self.state.is_playing = true;
        log::debug!("play from {:.3}s", offset);
        true
    }

    fn start_source_at(&mut self, offset: f64) {
        let frames = self
            .track
            .as_ref()
            .map(|t| offset * t.buffer.sample_rate() as f64)
            .unwrap_or(0.0);
        self.send(EngineCommand::Start { offset_frames: frames });
        self.clock_at_start = self.clock.seconds();
        self.state.start_offset = offset;
        self.state.current_time = offset;
    }

    /// Pause, keeping the position
    pub fn pause(&mut self) -> bool {
        if self.track.is_none() {
            log::warn!("pause: no track loaded");
            return false;
        }
        if self.state.is_playing {
            self.state.current_time = self.current_time();
            self.halt_source();
            log::debug!("pause at {:.3}s", self.state.current_time);
        }
        true
    }

    /// Stop and rewind to the start
    pub fn stop(&mut self) -> bool {
        // Any pending source wait belongs to a superseded request now
        self.generation += 1;
        if self.track.is_none() {
            return false;
        }
        self.halt_source();
        self.state.current_time = 0.0;
        self.state.start_offset = 0.0;
        if self.backend.state() == BackendState::Running {
            if let Err(e) = self.backend.suspend() {
                log::debug!("stop: could not suspend output: {}", e);
            }
        }
        true
    }

    fn halt_source(&mut self) {
        if self.state.is_playing {
            self.send(EngineCommand::Stop);
            self.state.is_playing = false;
        }
    }

    /// Move to `time`, clamped to `[0, duration]`
    ///
    /// While playing, the source is stopped and restarted at the new offset.
    pub fn seek(&mut self, time: f64) -> bool {
        let Some(duration) = self.track.as_ref().map(|t| t.duration) else {
            log::warn!("seek: no track loaded");
            return false;
        };
        if !time.is_finite() {
            log::warn!("seek: rejected non-finite time");
            return false;
        }
        let target = time.clamp(0.0, duration);

        if self.state.is_playing {
            self.send(EngineCommand::Stop);
            self.start_source_at(target);
        } else {
            self.state.current_time = target;
            self.state.start_offset = target;
        }
        true
    }

    /// Current position in seconds
    pub fn current_time(&self) -> f64 {
        let duration = self.duration();
        if self.state.is_playing {
            let elapsed = (self.clock.seconds() - self.clock_at_start).max(0.0);
            (self.state.start_offset + elapsed * self.state.playback_rate).clamp(0.0, duration)
        } else {
            self.state.current_time
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────

    /// Set the playback rate, clamped to [0.25, 4.0]; returns the applied rate
    pub fn set_playback_rate(&mut self, rate: f64) -> f64 {
        if !rate.is_finite() {
            return self.state.playback_rate;
        }
        let rate = rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
        if rate == self.state.playback_rate {
            return rate;
        }
        if self.state.is_playing {
            // Rebase so the position formula stays continuous across the change
            let now = self.current_time();
            self.state.start_offset = now;
            self.clock_at_start = self.clock.seconds();
        }
        self.state.playback_rate = rate;
        self.send(EngineCommand::SetRate(rate));
        rate
    }

    /// Set the transposition, clamped to [-24, 24]; 0 bypasses the pitch stage
    pub fn set_pitch_shift(&mut self, semitones: f64) -> f64 {
        if !semitones.is_finite() {
            return self.state.pitch_shift_semitones;
        }
        let semitones = semitones.clamp(MIN_PITCH_SEMITONES, MAX_PITCH_SEMITONES);
        if semitones != self.state.pitch_shift_semitones {
            self.state.pitch_shift_semitones = semitones;
            self.send(EngineCommand::SetPitch(semitones));
        }
        semitones
    }

    /// Set the output volume in dB, clamped to [-60, 12]
    pub fn set_volume(&mut self, db: f64) -> f64 {
        if !db.is_finite() {
            return self.state.volume_db;
        }
        let db = db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB);
        if db != self.state.volume_db {
            self.state.volume_db = db;
            self.send(EngineCommand::SetGain(db_to_gain(db)));
        }
        db
    }

    /// Switch the time-stretch quality
    ///
    /// With a track loaded the source is rebuilt, keeping the position and
    /// resuming if it was playing.
    pub fn set_quality(&mut self, mode: QualityMode) -> bool {
        if mode == self.state.quality {
            return true;
        }
        self.state.quality = mode;
        let Some(track) = self.track.clone() else {
            return true;
        };

        let was_playing = self.state.is_playing;
        let position = self.current_time();
        self.halt_source();

        self.generation += 1;
        let generation = self.generation;
        if let Err(e) = self.wire_source(track.buffer.clone(), generation) {
            log::error!("Failed to rebuild source for {} quality: {}", mode, e);
            self.track = None;
            self.send(EngineCommand::UnloadSource);
            self.state.current_time = 0.0;
            self.state.start_offset = 0.0;
            return false;
        }
        log::debug!("Quality switched to {}", mode);

        self.state.current_time = position;
        self.state.start_offset = position;
        if was_playing {
            self.play(Some(position));
        }
        true
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_loaded(&self) -> bool {
        self.track.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Track duration in seconds (0 when nothing is loaded)
    pub fn duration(&self) -> f64 {
        self.track.as_ref().map_or(0.0, |t| t.duration)
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn backend_state(&self) -> BackendState {
        self.backend.state()
    }

    fn send(&mut self, cmd: EngineCommand) {
        let Some(sender) = self.sender.as_mut() else {
            // Not started yet: parameters are pushed on initialize
            return;
        };
        if sender.try_send(cmd).is_err() {
            log::warn!("Engine command queue full, command dropped");
        }
    }
}

impl Transport for AudioCore {
    fn current_time(&self) -> f64 {
        AudioCore::current_time(self)
    }

    fn seek(&mut self, time: f64) -> bool {
        AudioCore::seek(self, time)
    }

    fn is_playing(&self) -> bool {
        AudioCore::is_playing(self)
    }

    fn duration(&self) -> f64 {
        AudioCore::duration(self)
    }
}

impl Drop for AudioCore {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineBackend;
    use crate::types::SampleBuffer;

    const RATE: u32 = 48000;

    fn core() -> (AudioCore, OfflineBackend) {
        let backend = OfflineBackend::new(RATE);
        let config = AudioCoreConfig {
            init_retry_window_ms: 400,
            ..Default::default()
        };
        (AudioCore::new(Box::new(backend.clone()), config), backend)
    }

    fn track(seconds: f64) -> TrackBuffer {
        let len = (seconds * 1000.0) as usize;
        SampleBuffer::new(1000, vec![vec![0.1; len]]).unwrap().into_shared()
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (mut core, _backend) = core();
        assert!(core.initialize());
        assert!(core.initialize());
        assert_eq!(core.backend_state(), BackendState::Running);
    }

    #[test]
    fn test_initialize_retries_then_succeeds() {
        let (mut core, backend) = core();
        backend.fail_next_starts(2);
        assert!(core.initialize());
    }

    #[test]
    fn test_initialize_gives_up_after_window() {
        let (mut core, backend) = core();
        backend.fail_next_starts(1000);
        let started = Instant::now();
        assert!(!core.initialize());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!core.is_initialized());
    }

    #[test]
    fn test_no_track_operations_fail() {
        let (mut core, _backend) = core();
        assert!(!core.play(None));
        assert!(!core.pause());
        assert!(!core.stop());
        assert!(!core.seek(3.0));
        assert_eq!(core.current_time(), 0.0);
    }

    #[test]
    fn test_load_wires_source() {
        let (mut core, backend) = core();
        assert!(core.load_buffer(track(10.0), "scales.wav"));
        assert!(core.is_loaded());
        assert!(backend.has_source());
        assert_eq!(core.duration(), 10.0);
        assert_eq!(core.track().map(|t| t.label.as_str()), Some("scales.wav"));
    }

    #[test]
    fn test_load_empty_buffer_leaves_nothing_loaded() {
        let (mut core, backend) = core();
        assert!(core.load_buffer(track(10.0), "first.wav"));
        let empty = SampleBuffer::new(1000, vec![vec![]]).unwrap().into_shared();
        assert!(!core.load_buffer(empty, "empty.wav"));
        assert!(!core.is_loaded());
        backend.render(64);
        assert!(!backend.has_source());
    }

    #[test]
    fn test_seek_clamps() {
        let (mut core, _backend) = core();
        core.load_buffer(track(200.0), "long.wav");
        assert!(core.seek(-10.0));
        assert_eq!(core.current_time(), 0.0);
        assert!(core.seek(500.0));
        assert_eq!(core.current_time(), 200.0);
        assert!(!core.seek(f64::NAN));
    }

    #[test]
    fn test_position_follows_clock_and_rate() {
        let (mut core, backend) = core();
        core.load_buffer(track(60.0), "etude.wav");
        core.set_playback_rate(0.5);
        assert!(core.play(Some(10.0)));

        backend.advance(2.0);
        assert!((core.current_time() - 11.0).abs() < 1e-6);

        core.set_playback_rate(2.0);
        backend.advance(1.0);
        assert!((core.current_time() - 13.0).abs() < 1e-6);
    }

    #[test]
    fn test_pause_keeps_and_stop_resets() {
        let (mut core, backend) = core();
        core.load_buffer(track(60.0), "etude.wav");
        core.play(None);
        backend.advance(1.5);
        assert!(core.pause());
        let paused_at = core.current_time();
        assert!((paused_at - 1.5).abs() < 1e-6);

        backend.advance(1.0);
        assert_eq!(core.current_time(), paused_at);

        assert!(core.stop());
        assert_eq!(core.current_time(), 0.0);
        assert_eq!(core.state().start_offset, 0.0);
        assert_eq!(core.backend_state(), BackendState::Suspended);

        assert!(core.play(None));
        assert_eq!(core.backend_state(), BackendState::Running);
    }

    #[test]
    fn test_seek_while_playing_restarts_from_target() {
        let (mut core, backend) = core();
        core.load_buffer(track(60.0), "etude.wav");
        core.play(None);
        backend.advance(1.0);
        core.seek(30.0);
        backend.advance(0.5);
        assert!((core.current_time() - 30.5).abs() < 1e-6);
    }

    #[test]
    fn test_position_clamped_to_duration() {
        let (mut core, backend) = core();
        core.load_buffer(track(1.0), "short.wav");
        core.play(None);
        backend.advance(3.0);
        assert_eq!(core.current_time(), 1.0);
    }

    #[test]
    fn test_parameter_ranges() {
        let (mut core, _backend) = core();
        assert_eq!(core.set_playback_rate(9.0), MAX_PLAYBACK_RATE);
        assert_eq!(core.set_playback_rate(0.01), MIN_PLAYBACK_RATE);
        assert_eq!(core.set_pitch_shift(-40.0), MIN_PITCH_SEMITONES);
        assert_eq!(core.set_volume(30.0), MAX_VOLUME_DB);
        assert_eq!(core.set_volume(-100.0), MIN_VOLUME_DB);
        assert_eq!(core.set_playback_rate(f64::NAN), MIN_PLAYBACK_RATE);
    }

    #[test]
    fn test_quality_change_preserves_position() {
        let (mut core, backend) = core();
        core.load_buffer(track(60.0), "etude.wav");
        core.play(Some(5.0));
        backend.advance(1.0);

        assert!(core.set_quality(QualityMode::High));
        assert!(core.is_playing());
        assert!((core.current_time() - 6.0).abs() < 1e-6);
        assert_eq!(core.state().quality, QualityMode::High);
    }

    #[test]
    fn test_failed_quality_rebuild_unloads() {
        let backend = OfflineBackend::new(RATE);
        let config = AudioCoreConfig {
            ready_timeout_ms: 50,
            ..Default::default()
        };
        let mut core = AudioCore::new(Box::new(backend.clone()), config);
        assert!(core.load_buffer(track(20.0), "etude.wav"));

        backend.stall(true);
        assert!(!core.set_quality(QualityMode::High));
        assert!(!core.is_loaded());
        assert_eq!(core.duration(), 0.0);
        assert!(!core.play(None));
    }

    #[test]
    fn test_destroy_is_repeatable() {
        let (mut core, backend) = core();
        core.load_buffer(track(5.0), "etude.wav");
        core.play(None);
        core.destroy();
        core.destroy();
        assert!(!core.is_loaded());
        assert_eq!(backend.state(), BackendState::Closed);
        assert!(!core.initialize());
    }
}
