//! Waveform view function
//!
//! ```ignore
//! fn view(&self) -> Element<Message> {
//!     let waveform = waveform_view(
//!         &self.waveform,
//!         Message::Seek,
//!         Message::Hover,
//!         Message::WaveformResized,
//!     );
//!     column![waveform, /* transport controls */].into()
//! }
//! ```

use super::canvas::WaveformCanvas;
use super::controller::WaveformController;
use iced::widget::Canvas;
use iced::{Element, Length};

/// Default waveform height in pixels
pub const WAVEFORM_HEIGHT: f32 = 120.0;

/// Create the practice waveform element
///
/// The canvas fills the available width; hand `on_resize` values to
/// [`WaveformController::resize`] so the bitmap tracks the real width.
pub fn waveform_view<'a, Message>(
    controller: &'a WaveformController,
    on_seek: impl Fn(f64) -> Message + 'a,
    on_hover: impl Fn(Option<f32>) -> Message + 'a,
    on_resize: impl Fn(f32, f32) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    Canvas::new(WaveformCanvas {
        controller,
        on_seek,
        on_hover,
        on_resize,
    })
    .width(Length::Fill)
    .height(Length::Fixed(WAVEFORM_HEIGHT))
    .into()
}
