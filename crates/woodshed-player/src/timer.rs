//! Practice stopwatch
//!
//! Counts time spent playing. The orchestrator starts and pauses it with
//! playback; the UI only reads the elapsed time.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use woodshed_core::practice::PracticeTimer;

#[derive(Debug, Default)]
struct StopwatchState {
    accumulated: Duration,
    running_since: Option<Instant>,
}

/// Cloneable handle; clones share the same stopwatch
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    state: Arc<Mutex<StopwatchState>>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        let state = self.lock();
        state.accumulated + state.running_since.map_or(Duration::ZERO, |t| t.elapsed())
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.accumulated = Duration::ZERO;
        if state.running_since.is_some() {
            state.running_since = Some(Instant::now());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StopwatchState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl PracticeTimer for Stopwatch {
    fn start(&mut self) {
        let mut state = self.lock();
        if state.running_since.is_none() {
            state.running_since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        if let Some(since) = state.running_since.take() {
            state.accumulated += since.elapsed();
        }
    }

    fn is_running(&self) -> bool {
        self.lock().running_since.is_some()
    }
}

/// `h:mm:ss` for the practice time readout
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
