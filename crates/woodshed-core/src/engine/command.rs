//! Lock-free command queue between the control side and the audio thread
//!
//! The control side never touches the graph directly. It pushes
//! [`EngineCommand`]s into an `rtrb` ring buffer, and the audio callback
//! drains the queue at the start of every block before rendering. Both
//! ends are wait-free and the ring is allocated once at startup.
//!
//! ```ignore
//! let (mut tx, mut rx) = command_channel();
//! tx.push(EngineCommand::SetRate(0.75))?;
//! graph.process_commands(&mut rx);
//! ```

use basedrop::Owned;

use super::source::GrainSource;

/// Commands sent from the control side to the audio thread
///
/// Commands are applied at block boundaries, so a block never sees a
/// half-applied parameter change.
pub enum EngineCommand {
    /// Wire a freshly built source into the graph, replacing the old one
    ///
    /// The graph acknowledges with `generation` once the source is in place.
    /// The previous source is dropped through the deferred collector.
    LoadSource {
        source: Owned<GrainSource>,
        generation: u64,
    },
    /// Disconnect and retire the current source
    UnloadSource,
    /// Start rendering the source from a position in source frames
    Start { offset_frames: f64 },
    /// Stop rendering the source (output goes silent, position is dropped)
    Stop,
    /// Playback rate (1.0 = original speed)
    SetRate(f64),
    /// Transposition in semitones; 0.0 bypasses the pitch stage
    SetPitch(f64),
    /// Linear output gain
    SetGain(f32),
}

/// Capacity of the command queue
///
/// A preset recall or session restore sends a handful of commands in a
/// burst; 64 leaves plenty of headroom.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Create a new command channel (producer/consumer pair)
///
/// The producer is owned by `AudioCore`, the consumer by the audio backend.
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
