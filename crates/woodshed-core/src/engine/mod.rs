//! Real-time audio engine
//!
//! This module contains everything that runs on (or is handed to) the audio
//! thread:
//! - PracticeGraph: grain source → pitch stage → gain → limiter
//! - GrainSource: time-stretching reader over the shared decoded buffer
//! - EngineCommand queue and EngineClock for lock-free control
//! - Deferred-drop collector for audio-thread owned allocations

mod clock;
mod command;
mod gc;
mod graph;
mod master_limiter;
mod pitch;
mod source;

pub use clock::*;
pub use command::*;
pub use gc::gc_handle;
pub use graph::*;
pub use master_limiter::*;
pub use pitch::*;
pub use source::*;
