//! Canvas Program for the practice waveform
//!
//! Translates pointer and layout events into application messages and draws
//! the [`WaveformController`] through a geometry cache. The cache is only
//! rebuilt when the controller's redraw revision moves, so a frame with no
//! changes reuses the previous geometry.

use std::cell::Cell;

use iced::widget::canvas::{self, Event, Geometry, Program};
use iced::{mouse, Rectangle, Theme};

use super::controller::WaveformController;

/// Canvas state for the waveform
#[derive(Default)]
pub struct WaveformInteraction {
    /// Whether the pointer was inside the canvas on the last event
    hovering: bool,
    cache: canvas::Cache,
    drawn_revision: Cell<Option<u64>>,
}

/// Canvas program for the practice waveform
///
/// - `on_seek`: click, with the time under the pointer
/// - `on_hover`: pointer x while inside, `None` when it leaves
/// - `on_resize`: the canvas bounds no longer match the controller's size
pub struct WaveformCanvas<'a, Message, S, H, R>
where
    S: Fn(f64) -> Message,
    H: Fn(Option<f32>) -> Message,
    R: Fn(f32, f32) -> Message,
{
    pub controller: &'a WaveformController,
    pub on_seek: S,
    pub on_hover: H,
    pub on_resize: R,
}

impl<'a, Message, S, H, R> Program<Message> for WaveformCanvas<'a, Message, S, H, R>
where
    Message: Clone,
    S: Fn(f64) -> Message,
    H: Fn(Option<f32>) -> Message,
    R: Fn(f32, f32) -> Message,
{
    type State = WaveformInteraction;

    fn update(
        &self,
        interaction: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        let (width, height) = self.controller.size();
        if bounds.width != width || bounds.height != height {
            return Some(canvas::Action::publish((self.on_resize)(bounds.width, bounds.height)));
        }

        match (event, cursor.position_in(bounds)) {
            (Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)), Some(position)) => {
                let time = self.controller.pointer_to_time(position.x);
                Some(canvas::Action::publish((self.on_seek)(time)))
            }
            (Event::Mouse(mouse::Event::CursorMoved { .. }), Some(position)) => {
                interaction.hovering = true;
                Some(canvas::Action::publish((self.on_hover)(Some(position.x))))
            }
            (Event::Mouse(mouse::Event::CursorMoved { .. } | mouse::Event::CursorLeft), None)
                if interaction.hovering =>
            {
                interaction.hovering = false;
                Some(canvas::Action::publish((self.on_hover)(None)))
            }
            _ => None,
        }
    }

    fn mouse_interaction(
        &self,
        _interaction: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.is_over(bounds) && self.controller.has_track() {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::default()
        }
    }

    fn draw(
        &self,
        interaction: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let revision = self.controller.revision();
        if interaction.drawn_revision.get() != Some(revision) {
            interaction.cache.clear();
            interaction.drawn_revision.set(Some(revision));
        }

        let geometry = interaction
            .cache
            .draw(renderer, bounds.size(), |frame| self.controller.render(frame));
        vec![geometry]
    }
}
