//! Manually rendered backend
//!
//! Renders the graph only when asked, on the caller's thread. Clones share
//! the same graph, so a test can hand one clone to `AudioCore` and keep
//! another to pull audio and advance the engine clock deterministically.

use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{AudioBackend, BackendState};
use super::config::MAX_BUFFER_SIZE;
use super::error::{AudioError, AudioResult};
use crate::engine::{EngineCommand, PracticeGraph};
use crate::types::StereoBuffer;

struct OfflineInner {
    graph: Option<PracticeGraph>,
    commands: Option<rtrb::Consumer<EngineCommand>>,
    state: BackendState,
    /// Number of upcoming `start` calls that should fail
    failing_starts: u32,
    /// Commands stay queued while set (simulates a hung device)
    stalled: bool,
    block: StereoBuffer,
}

#[derive(Clone)]
pub struct OfflineBackend {
    inner: Arc<Mutex<OfflineInner>>,
    sample_rate: u32,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OfflineInner {
                graph: None,
                commands: None,
                state: BackendState::Idle,
                failing_starts: 0,
                stalled: false,
                block: StereoBuffer::silence(MAX_BUFFER_SIZE),
            })),
            sample_rate,
        }
    }

    /// Make the next `count` calls to `start` fail (simulates a busy device)
    pub fn fail_next_starts(&self, count: u32) {
        self.lock().failing_starts = count;
    }

    /// Stop (or resume) servicing the command queue
    ///
    /// While stalled, rendering produces silence and no source is ever
    /// acknowledged, so loads and quality switches time out.
    pub fn stall(&self, stalled: bool) {
        self.lock().stalled = stalled;
    }

    /// Render `frames` frames and return them
    ///
    /// Commands are applied first. A suspended or unstarted backend returns
    /// silence and leaves the clock where it is.
    pub fn render(&self, frames: usize) -> StereoBuffer {
        let mut inner = self.lock();
        let inner = &mut *inner;
        let mut out = Vec::with_capacity(frames);

        if inner.stalled {
            return StereoBuffer::silence(frames);
        }
        let (Some(graph), Some(commands)) = (inner.graph.as_mut(), inner.commands.as_mut()) else {
            return StereoBuffer::silence(frames);
        };
        graph.process_commands(commands);

        if inner.state != BackendState::Running {
            return StereoBuffer::silence(frames);
        }

        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(MAX_BUFFER_SIZE);
            inner.block.set_len_from_capacity(n);
            graph.process(&mut inner.block);
            out.extend_from_slice(inner.block.as_slice());
            remaining -= n;
        }
        StereoBuffer::from_vec(out)
    }

    /// Render a duration in seconds, discarding the audio
    pub fn advance(&self, seconds: f64) {
        let frames = (seconds * self.sample_rate as f64).round() as usize;
        let _ = self.render(frames);
    }

    /// Whether the graph currently has a source wired
    pub fn has_source(&self) -> bool {
        self.lock().graph.as_ref().is_some_and(|g| g.has_source())
    }

    fn lock(&self) -> MutexGuard<'_, OfflineInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl AudioBackend for OfflineBackend {
    fn start(
        &mut self,
        mut graph: PracticeGraph,
        commands: rtrb::Consumer<EngineCommand>,
    ) -> AudioResult<()> {
        let mut inner = self.lock();
        if inner.state == BackendState::Closed {
            return Err(AudioError::NotStarted);
        }
        if inner.failing_starts > 0 {
            inner.failing_starts -= 1;
            return Err(AudioError::StreamPlayError("offline device busy".to_string()));
        }
        graph.prepare(self.sample_rate);
        inner.graph = Some(graph);
        inner.commands = Some(commands);
        inner.state = BackendState::Running;
        Ok(())
    }

    fn resume(&mut self) -> AudioResult<()> {
        let mut inner = self.lock();
        match inner.state {
            BackendState::Running | BackendState::Suspended => {
                inner.state = BackendState::Running;
                Ok(())
            }
            BackendState::Idle | BackendState::Closed => Err(AudioError::NotStarted),
        }
    }

    fn suspend(&mut self) -> AudioResult<()> {
        let mut inner = self.lock();
        match inner.state {
            BackendState::Running | BackendState::Suspended => {
                inner.state = BackendState::Suspended;
                Ok(())
            }
            BackendState::Idle | BackendState::Closed => Err(AudioError::NotStarted),
        }
    }

    fn state(&self) -> BackendState {
        self.lock().state
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn flush_commands(&mut self) {
        let mut inner = self.lock();
        let inner = &mut *inner;
        if inner.stalled {
            return;
        }
        if let (Some(graph), Some(commands)) = (inner.graph.as_mut(), inner.commands.as_mut()) {
            graph.process_commands(commands);
        }
    }

    fn close(&mut self) {
        let mut inner = self.lock();
        inner.graph = None;
        inner.commands = None;
        inner.state = BackendState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{command_channel, EngineClock};

    fn start(backend: &mut OfflineBackend) -> Arc<EngineClock> {
        let clock = Arc::new(EngineClock::new(48000));
        let (ready_tx, _ready_rx) = crossbeam::channel::bounded(1);
        let graph = PracticeGraph::new(48000, Arc::clone(&clock), ready_tx);
        let (_tx, rx) = command_channel();
        backend.start(graph, rx).unwrap();
        clock
    }

    #[test]
    fn test_render_advances_clock() {
        let mut backend = OfflineBackend::new(48000);
        let clock = start(&mut backend);
        let out = backend.render(20000);
        assert_eq!(out.len(), 20000);
        assert_eq!(clock.frames(), 20000);
    }

    #[test]
    fn test_suspended_freezes_clock() {
        let mut backend = OfflineBackend::new(48000);
        let clock = start(&mut backend);
        backend.suspend().unwrap();
        backend.advance(1.0);
        assert_eq!(clock.frames(), 0);
        backend.resume().unwrap();
        backend.advance(0.5);
        assert_eq!(clock.frames(), 24000);
    }

    #[test]
    fn test_failing_starts() {
        let mut backend = OfflineBackend::new(48000);
        backend.fail_next_starts(1);
        let (ready_tx, _) = crossbeam::channel::bounded(1);
        let graph = PracticeGraph::new(48000, Arc::new(EngineClock::new(48000)), ready_tx);
        let (_tx, rx) = command_channel();
        assert!(backend.start(graph, rx).is_err());
        assert_eq!(backend.state(), BackendState::Idle);
        start(&mut backend);
        assert_eq!(backend.state(), BackendState::Running);
    }

    #[test]
    fn test_close_is_final() {
        let mut backend = OfflineBackend::new(48000);
        start(&mut backend);
        backend.close();
        backend.close();
        assert_eq!(backend.state(), BackendState::Closed);
        assert!(backend.resume().is_err());
    }
}
