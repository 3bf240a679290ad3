//! Practice session logic
//!
//! Everything on the control side of the engine:
//! - AudioCore: owns the backend and the command queue, tracks position
//! - LoopController: A–B loop bounds, repetitions, tempo progression
//! - PitchTempoController: speed and transposition knobs
//! - Orchestrator: routes events between the above and drives the poll tick
//!
//! ```ignore
//! use woodshed_core::audio::CpalBackend;
//! use woodshed_core::practice::{AudioCore, Orchestrator};
//!
//! let audio = AudioCore::new(Box::new(CpalBackend::new(config.audio.output.clone())), config.audio.clone());
//! let mut practice = Orchestrator::new(audio, Box::new(timer), &config.practice);
//! practice.load(buffer, "etude-12.wav");
//! practice.play(None);
//! ```

mod audio_core;
mod collaborators;
mod loop_controller;
mod orchestrator;
mod pitch_tempo;
mod session;

pub use audio_core::{AudioCore, PlaybackState, Track};
pub use collaborators::{PracticeListener, PracticeTimer, SessionStore, Transport};
pub use loop_controller::{
    IncrementType, LoopController, LoopEvent, LoopRegion, LoopState, TempoProgression,
    DEFAULT_MAX_TEMPO_PERCENT, DEFAULT_ORIGINAL_TEMPO, MAX_TEMPO_CEILING, MIN_TEMPO_PERCENT,
};
pub use orchestrator::{poll_boundary, Orchestrator, TickReport};
pub use pitch_tempo::{PitchTempoController, PitchTempoEvent, OCTAVE, PITCH_PRESETS, SPEED_PRESETS};
pub use session::{MemorySessionStore, SessionSnapshot};
