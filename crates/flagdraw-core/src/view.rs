//! View transform: zoom, viewport offset and grid overlay.
//!
//! The view never changes buffer contents or resolution. It only maps pointer
//! positions between screen space and canvas (buffer) space.

use kurbo::{Affine, Line, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM_PERCENT: u32 = 25;
pub const MAX_ZOOM_PERCENT: u32 = 200;
pub const ZOOM_STEP_PERCENT: u32 = 25;
/// Spacing of the grid overlay, in canvas pixels.
pub const GRID_SPACING: f64 = 20.0;

/// Snap a requested zoom to the nearest step and clamp it to the allowed range.
pub fn clamp_zoom(requested: i64) -> u32 {
    let step = ZOOM_STEP_PERCENT as i64;
    // Bound first so the rounding below can't overflow.
    let bounded = requested.clamp(0, (MAX_ZOOM_PERCENT + ZOOM_STEP_PERCENT) as i64);
    let snapped = (bounded + step / 2) / step * step;
    snapped.clamp(MIN_ZOOM_PERCENT as i64, MAX_ZOOM_PERCENT as i64) as u32
}

/// View state for one drawing surface.
///
/// The canvas is scaled about its own centre, then translated by `offset`
/// (the canvas' top-left corner on screen at 100%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    /// Size of the canvas in canvas pixels.
    canvas_size: Size,
    /// Current zoom, in percent.
    zoom_percent: u32,
    /// Viewport offset in screen pixels.
    pub offset: Vec2,
    /// Whether the grid overlay is visible.
    pub show_grid: bool,
}

impl View {
    pub fn new(canvas_size: Size) -> Self {
        Self {
            canvas_size,
            zoom_percent: 100,
            offset: Vec2::ZERO,
            show_grid: false,
        }
    }

    pub fn zoom_percent(&self) -> u32 {
        self.zoom_percent
    }

    /// Zoom as a scale factor.
    pub fn scale(&self) -> f64 {
        self.zoom_percent as f64 / 100.0
    }

    /// Set an absolute zoom. Returns the zoom actually applied.
    pub fn set_zoom(&mut self, percent: i64) -> u32 {
        self.zoom_percent = clamp_zoom(percent);
        self.zoom_percent
    }

    /// Change the zoom by `delta` percent. Returns the zoom actually applied.
    pub fn zoom_by(&mut self, delta: i64) -> u32 {
        self.set_zoom((self.zoom_percent as i64).saturating_add(delta))
    }

    pub fn zoom_in(&mut self) -> u32 {
        self.zoom_by(ZOOM_STEP_PERCENT as i64)
    }

    pub fn zoom_out(&mut self) -> u32 {
        self.zoom_by(-(ZOOM_STEP_PERCENT as i64))
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.show_grid = !self.show_grid;
        self.show_grid
    }

    /// Canvas to screen.
    pub fn transform(&self) -> Affine {
        let center = Vec2::new(self.canvas_size.width / 2.0, self.canvas_size.height / 2.0);
        Affine::translate(self.offset + center)
            * Affine::scale(self.scale())
            * Affine::translate(-center)
    }

    /// Screen to canvas.
    pub fn inverse_transform(&self) -> Affine {
        self.transform().inverse()
    }

    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Grid lines in canvas space, or nothing when the grid is hidden.
    pub fn grid_lines(&self) -> Vec<Line> {
        if !self.show_grid {
            return Vec::new();
        }

        let Size { width, height } = self.canvas_size;
        let mut lines = Vec::new();
        let mut x = GRID_SPACING;
        while x < width {
            lines.push(Line::new((x, 0.0), (x, height)));
            x += GRID_SPACING;
        }
        let mut y = GRID_SPACING;
        while y < height {
            lines.push(Line::new((0.0, y), (width, y)));
            y += GRID_SPACING;
        }
        lines
    }
}
