//! Waveform view state, rendering and hit-testing
//!
//! `WaveformController` owns the bitmap for the current (track, width) pair
//! and the display-only copies of position, loop region and hover. It has no
//! playback authority: the host feeds it values after each orchestrator
//! tick and turns pointer positions back into seek times.
//!
//! Redraws are coalesced. Every mutation only marks the view dirty; the host
//! calls [`WaveformController::on_animation_frame`] once per frame and the
//! view is rendered at most once, and only when something changed.

use woodshed_core::practice::LoopRegion;
use woodshed_core::TrackBuffer;

use super::peaks::{generate_bitmap, WaveformBitmap};
use super::surface::WaveformSurface;
use crate::theme::WaveformStyle;

/// Loop marker line width
const MARKER_WIDTH: f32 = 2.0;

/// Horizontal gap between the hover line and its tooltip
const TOOLTIP_OFFSET: f32 = 4.0;

/// Room kept for the tooltip before it flips to the left of the line
const TOOLTIP_WIDTH: f32 = 56.0;

pub struct WaveformController {
    track: Option<TrackBuffer>,
    duration: f64,
    bitmap: WaveformBitmap,

    /// Logical size
    width: f32,
    height: f32,
    scale_factor: f32,

    position: f64,
    loop_start: Option<f64>,
    loop_end: Option<f64>,
    /// Pointer x in logical pixels while hovering
    hover_x: Option<f32>,

    style: WaveformStyle,
    redraw_pending: bool,
    /// Bumped on every redraw request; lets retained-mode hosts invalidate caches
    revision: u64,
}

impl Default for WaveformController {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformController {
    pub fn new() -> Self {
        Self {
            track: None,
            duration: 0.0,
            bitmap: Vec::new(),
            width: 0.0,
            height: 0.0,
            scale_factor: 1.0,
            position: 0.0,
            loop_start: None,
            loop_end: None,
            hover_x: None,
            style: WaveformStyle::default(),
            redraw_pending: false,
            revision: 0,
        }
    }

    pub fn with_style(mut self, style: WaveformStyle) -> Self {
        self.style = style;
        self
    }

    // ─────────────────────────────────────────────────────────────
    // Inputs
    // ─────────────────────────────────────────────────────────────

    /// Replace the displayed track (`None` clears the view)
    ///
    /// Any bitmap of the previous track is discarded.
    pub fn set_track(&mut self, track: Option<TrackBuffer>) {
        self.duration = track.as_ref().map_or(0.0, |t| t.duration());
        self.track = track;
        self.position = 0.0;
        self.loop_start = None;
        self.loop_end = None;
        self.regenerate();
    }

    /// Resize the drawing area (logical pixels) at the given device pixel ratio
    ///
    /// The bitmap is sampled at device resolution, so a change of either the
    /// size or the ratio regenerates it. Returns whether anything changed.
    pub fn resize(&mut self, width: f32, height: f32, scale_factor: f32) -> bool {
        let width = sanitize_extent(width);
        let height = sanitize_extent(height);
        let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };

        if width == self.width && height == self.height && scale_factor == self.scale_factor {
            return false;
        }
        self.width = width;
        self.height = height;
        self.scale_factor = scale_factor;
        self.regenerate();
        true
    }

    pub fn set_position(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.clamp(0.0, self.duration) } else { 0.0 };
        if seconds != self.position {
            self.position = seconds;
            self.request_redraw();
        }
    }

    pub fn set_loop(&mut self, start: Option<f64>, end: Option<f64>) {
        if start != self.loop_start || end != self.loop_end {
            self.loop_start = start;
            self.loop_end = end;
            self.request_redraw();
        }
    }

    pub fn set_loop_region(&mut self, region: &LoopRegion) {
        self.set_loop(region.start, region.end);
    }

    /// Pointer x while hovering, `None` once it leaves
    pub fn set_hover(&mut self, x: Option<f32>) {
        if x != self.hover_x {
            self.hover_x = x;
            self.request_redraw();
        }
    }

    fn regenerate(&mut self) {
        let pixels = self.pixel_width();
        self.bitmap = match &self.track {
            Some(track) if pixels > 0 => generate_bitmap(track, pixels),
            _ => Vec::new(),
        };
        log::debug!("Waveform bitmap regenerated: {} columns", self.bitmap.len());
        self.request_redraw();
    }

    // ─────────────────────────────────────────────────────────────
    // Frame scheduling
    // ─────────────────────────────────────────────────────────────

    pub fn request_redraw(&mut self) {
        self.redraw_pending = true;
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn is_redraw_pending(&self) -> bool {
        self.redraw_pending
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Render if a redraw is pending; returns whether it rendered
    pub fn on_animation_frame(&mut self, surface: &mut dyn WaveformSurface) -> bool {
        if !self.redraw_pending {
            return false;
        }
        self.redraw_pending = false;
        self.render(surface);
        true
    }

    // ─────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────

    /// Draw the full view onto `surface`
    pub fn render(&self, surface: &mut dyn WaveformSurface) {
        let (w, h) = (self.width, self.height);
        let style = &self.style;
        surface.fill_rect(0.0, 0.0, w, h, style.background);

        if self.bitmap.is_empty() || self.duration <= 0.0 {
            return;
        }

        // Bars, one per device pixel column
        let column_width = w / self.bitmap.len() as f32;
        let half = h / 2.0;
        for (i, &(min, max)) in self.bitmap.iter().enumerate() {
            let top = half - max.clamp(-1.0, 1.0) * half;
            let bar = ((max - min).clamp(0.0, 2.0) * half).max(1.0 / self.scale_factor);
            surface.fill_rect(i as f32 * column_width, top, column_width, bar, style.bars);
        }

        let played = self.time_to_x(self.position);
        if played > 0.0 {
            surface.fill_rect(0.0, 0.0, played, h, style.played_overlay);
        }

        self.render_loop(surface);

        surface.stroke_line((played, 0.0), (played, h), 1.0, style.playhead);

        if let Some(x) = self.hover_x {
            let x = x.clamp(0.0, w);
            surface.stroke_line((x, 0.0), (x, h), 1.0, style.hover_line);
            let label = format_time(self.pointer_to_time(x));
            let text_x = if x + TOOLTIP_OFFSET + TOOLTIP_WIDTH > w {
                x - TOOLTIP_OFFSET - TOOLTIP_WIDTH
            } else {
                x + TOOLTIP_OFFSET
            };
            surface.fill_text(&label, text_x.max(0.0), TOOLTIP_OFFSET, style.hover_text);
        }
    }

    fn render_loop(&self, surface: &mut dyn WaveformSurface) {
        let h = self.height;
        let start = self.loop_start.map(|t| self.time_to_x(t));
        let end = self.loop_end.map(|t| self.time_to_x(t));

        if let (Some(a), Some(b)) = (start, end) {
            if b > a {
                surface.fill_rect(a, 0.0, b - a, h, self.style.loop_fill);
            }
        }
        if let Some(a) = start {
            surface.stroke_line((a, 0.0), (a, h), MARKER_WIDTH, self.style.loop_start);
        }
        if let Some(b) = end {
            surface.stroke_line((b, 0.0), (b, h), MARKER_WIDTH, self.style.loop_end);
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Hit-testing
    // ─────────────────────────────────────────────────────────────

    /// Map a pointer x (logical pixels) to a track time in `[0, duration]`
    pub fn pointer_to_time(&self, x: f32) -> f64 {
        if self.width <= 0.0 || !x.is_finite() {
            return 0.0;
        }
        (x as f64 / self.width as f64 * self.duration).clamp(0.0, self.duration)
    }

    fn time_to_x(&self, seconds: f64) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        ((seconds / self.duration).clamp(0.0, 1.0) * self.width as f64) as f32
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn bitmap(&self) -> &[(f32, f32)] {
        &self.bitmap
    }

    /// Bitmap width in device pixels
    pub fn pixel_width(&self) -> usize {
        (self.width * self.scale_factor).round() as usize
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn has_track(&self) -> bool {
        self.track.is_some()
    }
}

fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// `m:ss.t` for tooltips and time readouts
pub fn format_time(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let secs = (tenths % 600) / 10;
    format!("{}:{:02}.{}", minutes, secs, tenths % 10)
}
