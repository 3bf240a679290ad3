//! Session snapshot
//!
//! The value handed to and read back from a [`SessionStore`]. It is produced
//! by `Orchestrator::get_state` and consumed by `Orchestrator::set_state`,
//! always by value.
//!
//! [`SessionStore`]: super::SessionStore

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::collaborators::SessionStore;
use super::loop_controller::{LoopRegion, LoopState, TempoProgression};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub speed: f64,
    pub pitch_shift_semitones: f64,
    pub loop_start: Option<f64>,
    pub loop_end: Option<f64>,
    pub loop_enabled: bool,
    pub tempo_progression: TempoProgression,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch_shift_semitones: 0.0,
            loop_start: None,
            loop_end: None,
            loop_enabled: false,
            tempo_progression: TempoProgression::default(),
        }
    }
}

impl SessionSnapshot {
    /// Loop controller state carried by this snapshot
    ///
    /// The repetition count is not part of a session and starts at zero.
    pub fn loop_state(&self) -> LoopState {
        LoopState {
            region: LoopRegion {
                start: self.loop_start,
                end: self.loop_end,
                enabled: self.loop_enabled,
                completed_count: 0,
            },
            progression: self.tempo_progression.clone(),
        }
    }
}

/// In-memory store, keyed by track id
///
/// Useful for headless hosts and tests; the player persists to YAML instead.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    sessions: HashMap<String, Vec<SessionSnapshot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save_loop_session(&mut self, track_id: &str, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        self.sessions
            .entry(track_id.to_string())
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    fn loop_sessions(&self, track_id: &str) -> anyhow::Result<Vec<SessionSnapshot>> {
        Ok(self.sessions.get(track_id).cloned().unwrap_or_default())
    }

    fn delete_loop_session(&mut self, track_id: &str, index: usize) -> anyhow::Result<()> {
        let sessions = self
            .sessions
            .get_mut(track_id)
            .filter(|s| index < s.len())
            .ok_or_else(|| anyhow::anyhow!("No session {} for track {:?}", index, track_id))?;
        sessions.remove(index);
        Ok(())
    }
}
