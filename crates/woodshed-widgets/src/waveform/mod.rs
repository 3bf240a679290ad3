//! Practice waveform
//!
//! - `generate_bitmap`: per-pixel `(min, max)` summary of a decoded buffer
//! - `WaveformController`: display state, rendering and pointer hit-testing
//! - `WaveformSurface`: the 2D primitives rendering needs (implemented for
//!   the iced canvas `Frame`)
//! - `waveform_view`: canvas element for iced applications

mod canvas;
mod controller;
mod peaks;
mod surface;
mod view;

pub use canvas::{WaveformCanvas, WaveformInteraction};
pub use controller::{format_time, WaveformController};
pub use peaks::{generate_bitmap, WaveformBitmap};
pub use surface::{WaveformSurface, TOOLTIP_TEXT_SIZE};
pub use view::{waveform_view, WAVEFORM_HEIGHT};
