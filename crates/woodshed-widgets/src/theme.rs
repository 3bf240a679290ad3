//! Shared theme constants for woodshed UI components
//!
//! Colors used by the waveform and the transport controls.

use iced::Color;

/// Loop start marker (green, "A")
pub const LOOP_START_COLOR: Color = Color::from_rgb(0.3, 0.85, 0.45);

/// Loop end marker (red, "B")
pub const LOOP_END_COLOR: Color = Color::from_rgb(0.95, 0.35, 0.3);

/// Waveform colour scheme
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformStyle {
    pub background: Color,
    pub bars: Color,
    /// Drawn over the part of the track that has already played
    pub played_overlay: Color,
    pub playhead: Color,
    pub loop_start: Color,
    pub loop_end: Color,
    /// Translucent fill between the loop markers
    pub loop_fill: Color,
    pub hover_line: Color,
    pub hover_text: Color,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            background: Color::from_rgb(0.1, 0.1, 0.12),
            bars: Color::from_rgb(0.45, 0.6, 0.85),
            played_overlay: Color::from_rgba(1.0, 0.75, 0.3, 0.25),
            playhead: Color::WHITE,
            loop_start: LOOP_START_COLOR,
            loop_end: LOOP_END_COLOR,
            loop_fill: Color::from_rgba(0.9, 0.9, 0.4, 0.15),
            hover_line: Color::from_rgba(1.0, 1.0, 1.0, 0.5),
            hover_text: Color::from_rgb(0.9, 0.9, 0.9),
        }
    }
}
