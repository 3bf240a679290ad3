//! Shared UI widgets for woodshed
//!
//! ## Architecture (iced 0.14 patterns)
//!
//! - **Controller**: `WaveformController` holds display state and renders
//!   through the `WaveformSurface` trait, so it is testable without a GPU
//! - **View functions**: take state + callbacks, return `Element<Message>`
//! - **Canvas Programs**: translate pointer/layout events into callbacks

pub mod theme;
pub mod waveform;

pub use theme::{WaveformStyle, LOOP_END_COLOR, LOOP_START_COLOR};

pub use waveform::{
    format_time, generate_bitmap, waveform_view, WaveformBitmap, WaveformCanvas,
    WaveformController, WaveformInteraction, WaveformSurface, WAVEFORM_HEIGHT,
};
