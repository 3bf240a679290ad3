//! Real-time practice graph
//!
//! Signal path, rendered once per device block:
//!
//! ```text
//! GrainSource (speed) → PitchStage → gain → MasterLimiter → device
//! ```
//!
//! The graph is built on the control side, handed to an [`AudioBackend`]
//! together with the consumer end of the command queue, and from then on is
//! owned exclusively by the audio thread. The only things shared with the
//! control side are the [`EngineClock`] and the ready-acknowledgement sender.
//!
//! [`AudioBackend`]: crate::audio::AudioBackend

use std::sync::Arc;

use basedrop::Owned;
use crossbeam::channel::Sender;

use super::clock::EngineClock;
use super::command::EngineCommand;
use super::master_limiter::MasterLimiter;
use super::pitch::PitchStage;
use super::source::GrainSource;
use crate::audio::MAX_BUFFER_SIZE;
use crate::types::{StereoBuffer, MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE};

pub struct PracticeGraph {
    clock: Arc<EngineClock>,
    ready_tx: Sender<u64>,
    source: Option<Owned<GrainSource>>,
    pitch: PitchStage,
    limiter: MasterLimiter,
    rate: f64,
    gain: f32,
}

impl PracticeGraph {
    /// Build an empty graph (no source wired) for `sample_rate`
    pub fn new(sample_rate: u32, clock: Arc<EngineClock>, ready_tx: Sender<u64>) -> Self {
        clock.set_sample_rate(sample_rate);
        Self {
            clock,
            ready_tx,
            source: None,
            pitch: PitchStage::new(sample_rate),
            limiter: MasterLimiter::new(sample_rate),
            rate: 1.0,
            gain: 1.0,
        }
    }

    /// Rebuild the rate-dependent stages once the device rate is known
    ///
    /// Backends call this from `start` before moving the graph to the audio
    /// thread.
    pub fn prepare(&mut self, sample_rate: u32) {
        if sample_rate == self.clock.sample_rate() {
            return;
        }
        log::debug!("Preparing practice graph for {} Hz", sample_rate);
        self.clock.set_sample_rate(sample_rate);
        let semitones = self.pitch.semitones();
        self.pitch = PitchStage::new(sample_rate);
        self.pitch.set_semitones(semitones);
        self.limiter = MasterLimiter::new(sample_rate);
    }

    pub fn clock(&self) -> &Arc<EngineClock> {
        &self.clock
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_source_playing(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.is_playing())
    }

    /// Drain and apply all pending commands
    pub fn process_commands(&mut self, commands: &mut rtrb::Consumer<EngineCommand>) {
        while let Ok(cmd) = commands.pop() {
            self.apply(cmd);
        }
    }

    fn apply(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::LoadSource { source, generation } => {
                // Previous source (if any) is retired through the collector
                self.source = Some(source);
                self.pitch.reset();
                self.limiter.reset();
                let _ = self.ready_tx.try_send(generation);
            }
            EngineCommand::UnloadSource => {
                self.source = None;
            }
            EngineCommand::Start { offset_frames } => {
                if let Some(source) = self.source.as_mut() {
                    source.start(offset_frames);
                    self.pitch.reset();
                }
            }
            EngineCommand::Stop => {
                if let Some(source) = self.source.as_mut() {
                    source.stop();
                }
            }
            EngineCommand::SetRate(rate) => {
                self.rate = rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
            }
            EngineCommand::SetPitch(semitones) => {
                self.pitch.set_semitones(semitones);
            }
            EngineCommand::SetGain(gain) => {
                self.gain = gain.max(0.0);
            }
        }
    }

    /// Render one block into `output` and advance the clock
    ///
    /// Blocks larger than `MAX_BUFFER_SIZE` are rendered in chunks by the
    /// backend; this method expects `output.len() <= MAX_BUFFER_SIZE`.
    pub fn process(&mut self, output: &mut StereoBuffer) {
        debug_assert!(output.len() <= MAX_BUFFER_SIZE);

        match self.source.as_mut() {
            Some(source) => source.render(self.rate, output),
            None => output.fill_silence(),
        }

        self.pitch.process(output);
        if self.gain != 1.0 {
            output.scale(self.gain);
        }
        self.limiter.process(output);

        self.clock.advance(output.len());
    }
}
