//! Player configuration
//!
//! Stored as YAML in the user's config directory.
//! Default location: ~/.config/woodshed/config.yaml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use woodshed_core::config::PracticeConfig;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Engine and practice settings
    pub engine: PracticeConfig,
    /// Display settings
    pub display: DisplayConfig,
    /// Last file opened, offered again at startup
    pub last_file: Option<PathBuf>,
}

/// Display configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Device pixel ratio override for the waveform bitmap
    /// Default: unset, follow the window's scale factor
    pub scale_factor: Option<f32>,
    /// Window size at startup
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            scale_factor: None,
            window_width: 1000.0,
            window_height: 520.0,
        }
    }
}
