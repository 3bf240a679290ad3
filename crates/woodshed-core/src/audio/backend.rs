//! Audio backend trait
//!
//! A backend takes ownership of a prepared [`PracticeGraph`] and the consumer
//! end of the command queue, and drives the graph from its render loop:
//! - **CpalBackend**: the system output device, rendered by cpal's callback
//! - **OfflineBackend**: rendered on demand, for tests and headless hosts
//!
//! Both follow the same contract: commands are drained at the start of every
//! block, and a suspended backend keeps draining commands but renders silence
//! and does not advance the engine clock.

use crate::engine::{EngineCommand, PracticeGraph};

use super::error::{AudioError, AudioResult};

/// Lifecycle state of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendState {
    /// Not started yet
    #[default]
    Idle,
    Running,
    /// Stream alive, output silent, clock frozen
    Suspended,
    /// Closed for good
    Closed,
}

pub trait AudioBackend {
    /// Move the graph to the render thread and start the stream
    fn start(
        &mut self,
        graph: PracticeGraph,
        commands: rtrb::Consumer<EngineCommand>,
    ) -> AudioResult<()>;

    fn resume(&mut self) -> AudioResult<()>;

    fn suspend(&mut self) -> AudioResult<()>;

    fn state(&self) -> BackendState;

    /// Device sample rate (meaningful once started)
    fn sample_rate(&self) -> u32;

    /// Ask the render side to apply queued commands now
    ///
    /// Realtime backends drain on their next callback, so the default is a
    /// no-op. Manually rendered backends apply the queue immediately.
    fn flush_commands(&mut self) {}

    /// Stop the stream and release the graph; safe to call repeatedly
    fn close(&mut self);
}

/// Command sender for the control side
///
/// Wraps the lock-free producer for sending [`EngineCommand`]s to the audio
/// thread. Never blocks.
pub struct CommandSender {
    producer: rtrb::Producer<EngineCommand>,
}

impl CommandSender {
    pub fn new(producer: rtrb::Producer<EngineCommand>) -> Self {
        Self { producer }
    }

    /// Queue a command
    ///
    /// Returns `Err(cmd)` if the queue is full (the command is handed back).
    pub fn send(&mut self, cmd: EngineCommand) -> Result<(), EngineCommand> {
        self.producer.push(cmd).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Queue a command, mapping a full queue to [`AudioError::QueueFull`]
    pub fn try_send(&mut self, cmd: EngineCommand) -> AudioResult<()> {
        self.send(cmd).map_err(|_| AudioError::QueueFull)
    }

    /// Check if the queue has space for more commands
    pub fn has_space(&self) -> bool {
        self.producer.slots() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command_channel;

    #[test]
    fn test_full_queue_maps_to_error() {
        let (tx, _rx) = command_channel();
        let mut sender = CommandSender::new(tx);
        while sender.has_space() {
            assert!(sender.try_send(EngineCommand::Stop).is_ok());
        }
        assert!(matches!(
            sender.try_send(EngineCommand::Stop),
            Err(AudioError::QueueFull)
        ));
    }
}
