//! Drawing surface abstraction
//!
//! `WaveformController` only needs three primitives, so it draws through
//! this trait instead of an iced `Frame` directly. Tests render into a
//! recording surface; the player renders into the canvas frame.

use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{Frame, Path, Stroke, Text};
use iced::{Color, Point, Size};

/// Font size of the hover tooltip
pub const TOOLTIP_TEXT_SIZE: f32 = 12.0;

/// Minimal 2D context in logical pixels, origin top-left
pub trait WaveformSurface {
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color);

    /// Draw `text` with its top-left corner at `(x, y)`
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Color);
}

impl WaveformSurface for Frame {
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.fill_rectangle(Point::new(x, y), Size::new(width, height), color);
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        self.stroke(
            &Path::line(Point::new(from.0, from.1), Point::new(to.0, to.1)),
            Stroke::default().with_color(color).with_width(width),
        );
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Color) {
        Frame::fill_text(
            self,
            Text {
                content: text.to_string(),
                position: Point::new(x, y),
                size: TOOLTIP_TEXT_SIZE.into(),
                color,
                align_x: Horizontal::Left.into(),
                align_y: Vertical::Top.into(),
                ..Text::default()
            },
        );
    }
}
