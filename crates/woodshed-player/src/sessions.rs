//! Saved loop sessions on disk
//!
//! All sessions live in one YAML file keyed by track id (the file path of
//! the track). The whole file is rewritten after every change.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use woodshed_core::config::{read_yaml, write_yaml};
use woodshed_core::practice::{SessionSnapshot, SessionStore};

pub struct YamlSessionStore {
    path: PathBuf,
    sessions: BTreeMap<String, Vec<SessionSnapshot>>,
}

impl YamlSessionStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: PathBuf) -> Result<Self> {
        let sessions = if path.exists() {
            read_yaml(&path)?
        } else {
            BTreeMap::new()
        };
        log::info!("Session store at {:?} ({} tracks)", path, sessions.len());
        Ok(Self { path, sessions })
    }

    /// Write `sessions` to disk and adopt them only once that succeeded
    fn commit(&mut self, sessions: BTreeMap<String, Vec<SessionSnapshot>>) -> Result<()> {
        write_yaml(&sessions, &self.path)?;
        self.sessions = sessions;
        Ok(())
    }
}

impl SessionStore for YamlSessionStore {
    fn save_loop_session(&mut self, track_id: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let mut sessions = self.sessions.clone();
        sessions
            .entry(track_id.to_string())
            .or_default()
            .push(snapshot.clone());
        self.commit(sessions)
    }

    fn loop_sessions(&self, track_id: &str) -> Result<Vec<SessionSnapshot>> {
        Ok(self.sessions.get(track_id).cloned().unwrap_or_default())
    }

    fn delete_loop_session(&mut self, track_id: &str, index: usize) -> Result<()> {
        let mut sessions = self.sessions.clone();
        let list = sessions
            .get_mut(track_id)
            .filter(|list| index < list.len())
            .ok_or_else(|| anyhow!("No session {} for {:?}", index, track_id))?;
        list.remove(index);
        if list.is_empty() {
            sessions.remove(track_id);
        }
        self.commit(sessions)
    }
}
