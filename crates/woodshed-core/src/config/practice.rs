//! Engine and practice settings
//!
//! Both halves are `#[serde(default)]`, so a config file only needs the keys
//! it wants to override.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::practice::TempoProgression;
use crate::timestretch::QualityMode;

/// Settings for `AudioCore`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioCoreConfig {
    /// Output device and buffer settings
    pub output: AudioConfig,

    /// How long `initialize` keeps retrying a backend that fails to start
    /// Default: 3000 ms
    pub init_retry_window_ms: u64,

    /// How long `load_buffer` waits for the graph to accept a new source
    /// Default: 2000 ms
    pub ready_timeout_ms: u64,

    /// Time-stretch quality used for newly loaded tracks
    pub quality: QualityMode,

    /// Output volume in dB
    pub volume_db: f64,
}

impl Default for AudioCoreConfig {
    fn default() -> Self {
        Self {
            output: AudioConfig::default(),
            init_retry_window_ms: 3000,
            ready_timeout_ms: 2000,
            quality: QualityMode::default(),
            volume_db: 0.0,
        }
    }
}

impl AudioCoreConfig {
    pub fn init_retry_window(&self) -> Duration {
        Duration::from_millis(self.init_retry_window_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Settings for the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeDefaults {
    /// Position poll cadence while playing
    /// Default: 50 ms
    pub poll_interval_ms: u64,

    /// Start and pause the practice timer together with playback
    pub sync_with_timer: bool,

    /// Keep pitch constant when the speed changes
    pub preserve_pitch: bool,

    /// Progression settings applied at startup
    pub progression: TempoProgression,
}

impl Default for PracticeDefaults {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            sync_with_timer: true,
            preserve_pitch: true,
            progression: TempoProgression::default(),
        }
    }
}

impl PracticeDefaults {
    /// Poll cadence, never shorter than 5 ms
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(5))
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    pub audio: AudioCoreConfig,
    pub practice: PracticeDefaults,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PracticeConfig::default();
        assert_eq!(config.audio.init_retry_window(), Duration::from_secs(3));
        assert_eq!(config.audio.ready_timeout(), Duration::from_secs(2));
        assert_eq!(config.practice.poll_interval(), Duration::from_millis(50));
        assert!(config.practice.preserve_pitch);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "audio:\n  quality: high\npractice:\n  poll_interval_ms: 20\n";
        let config: PracticeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.audio.quality, QualityMode::High);
        assert_eq!(config.audio.init_retry_window_ms, 3000);
        assert_eq!(config.practice.poll_interval_ms, 20);
        assert!(config.practice.sync_with_timer);
    }

    #[test]
    fn test_poll_interval_floor() {
        let defaults = PracticeDefaults {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(defaults.poll_interval(), Duration::from_millis(5));
    }
}
