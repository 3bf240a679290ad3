//! Audio output configuration
//!
//! Device selection and buffer settings for the output stream. Serialized as
//! part of the player's YAML config.

use serde::{Deserialize, Serialize};

/// Maximum block size the graph pre-allocates for
///
/// Device blocks larger than this are rendered in several chunks.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default buffer size when no preference is specified (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Preferred sample rate for the output stream
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Preferred buffer size for the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the device pick
    #[default]
    Default,
    /// Request a specific size in frames (clamped to 64..=MAX_BUFFER_SIZE)
    Fixed(u32),
}

impl BufferSize {
    /// Buffer size in frames, or None for the device default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some((*frames).clamp(64, MAX_BUFFER_SIZE as u32)),
        }
    }

    /// Latency in milliseconds for a given sample rate, if the size is fixed
    pub fn latency_ms(&self, sample_rate: u32) -> Option<f32> {
        self.as_frames()
            .map(|frames| (frames as f32 / sample_rate as f32) * 1000.0)
    }
}

/// Audio device identifier
///
/// Includes the host backend name (ALSA, JACK, CoreAudio, ...) so a device can
/// be picked on systems that expose several hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Display label including the host when known
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Output stream configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub device: Option<DeviceId>,
    pub buffer_size: BufferSize,
    /// Preferred sample rate (None = DEFAULT_SAMPLE_RATE if supported)
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_buffer_is_clamped() {
        assert_eq!(BufferSize::Fixed(16).as_frames(), Some(64));
        assert_eq!(BufferSize::Fixed(100_000).as_frames(), Some(MAX_BUFFER_SIZE as u32));
        assert_eq!(BufferSize::Default.as_frames(), None);
    }

    #[test]
    fn test_device_label() {
        assert_eq!(DeviceId::with_host("hw:0", "Alsa").display_label(), "[Alsa] hw:0");
        assert_eq!(DeviceId::new("Speakers").display_label(), "Speakers");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AudioConfig = serde_yaml::from_str("sample_rate: 44100").unwrap();
        assert_eq!(config.sample_rate, Some(44100));
        assert_eq!(config.buffer_size, BufferSize::Default);
        assert!(config.device.is_none());
    }
}
