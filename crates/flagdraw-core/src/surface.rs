//! The drawing surface: pixel buffer, pointer handling and export.

use crate::color::Rgba;
use crate::export::{MAX_IMAGE_DATA_LEN, encode_data_url};
use crate::history::{Disc, Operation, OperationLog, Segment, render_disc, render_segment};
use crate::raster::{CoverageMask, EncodeError, PixelBuffer};
use crate::tools::{StyleState, Template, ToolConfig, ToolKind};
use crate::view::View;
use kurbo::{Point, Size};
use thiserror::Error;

/// Logical canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 800;
/// Logical canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 600;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Surface has no rendering context")]
    NoContext,
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("Exported image is {len} bytes, limit is {max}")]
    TooLarge { len: usize, max: usize },
}

/// Snapshot of the per-surface interaction and view state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingSessionState {
    pub is_drawing: bool,
    /// Last pointer position, in canvas space.
    pub last_point: Point,
    pub zoom_percent: u32,
    pub show_grid: bool,
}

/// What the current drag is building.
#[derive(Debug, Clone, Default)]
enum Interaction {
    #[default]
    Idle,
    Stroke {
        segments: Vec<Segment>,
        mask: CoverageMask,
    },
    Erase {
        discs: Vec<Disc>,
    },
    Shape {
        tool: ToolKind,
        anchor: Point,
        style: StyleState,
    },
}

/// A fixed-size raster canvas driven by pointer events.
///
/// Pointer positions are given in screen space and converted through the
/// [`View`] before they reach the buffer. Drawing is immediate: every event
/// mutates the buffer right away, and each finished drag is recorded in the
/// operation log for undo.
///
/// A detached surface has no rendering context. Everything except view
/// changes is ignored until [`DrawingSurface::mount`] is called.
#[derive(Debug, Clone)]
pub struct DrawingSurface {
    width: u32,
    height: u32,
    background: Rgba,
    context: Option<PixelBuffer>,
    view: View,
    log: OperationLog,
    interaction: Interaction,
    is_drawing: bool,
    last_point: Point,
}

impl Default for DrawingSurface {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

impl DrawingSurface {
    /// Create a mounted surface with a white background.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, Rgba::WHITE)
    }

    /// Create a mounted surface with the given background fill.
    pub fn with_background(width: u32, height: u32, background: Rgba) -> Self {
        let mut surface = Self::detached(width, height, background);
        surface.mount();
        surface
    }

    /// Create a surface without a rendering context.
    pub fn detached(width: u32, height: u32, background: Rgba) -> Self {
        Self {
            width,
            height,
            background,
            context: None,
            view: View::new(Size::new(width as f64, height as f64)),
            log: OperationLog::new(width, height, background),
            interaction: Interaction::Idle,
            is_drawing: false,
            last_point: Point::ZERO,
        }
    }

    /// Attach a rendering context, painting whatever the log holds.
    pub fn mount(&mut self) {
        if self.context.is_none() {
            self.context = Some(self.log.replay());
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.context.is_some()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    pub fn buffer(&self) -> Option<&PixelBuffer> {
        self.context.as_ref()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    pub fn session(&self) -> DrawingSessionState {
        DrawingSessionState {
            is_drawing: self.is_drawing,
            last_point: self.last_point,
            zoom_percent: self.view.zoom_percent(),
            show_grid: self.view.show_grid,
        }
    }

    /// Start a drag at `screen`.
    pub fn pointer_down(&mut self, screen: Point, config: &ToolConfig) {
        if self.context.is_none() || !config.tool.is_supported() {
            return;
        }
        if self.is_drawing {
            self.finish_interaction();
        }

        let point = self.view.screen_to_canvas(screen);
        self.interaction = match config.tool {
            ToolKind::Brush => Interaction::Stroke {
                segments: Vec::new(),
                mask: CoverageMask::new(self.width, self.height),
            },
            ToolKind::Eraser => {
                let disc = Disc {
                    center: point,
                    diameter: config.style.brush_size() as f64,
                };
                if let Some(buffer) = self.context.as_mut() {
                    render_disc(buffer, &disc);
                }
                Interaction::Erase { discs: vec![disc] }
            }
            ToolKind::Rectangle | ToolKind::Circle | ToolKind::Line => Interaction::Shape {
                tool: config.tool,
                anchor: point,
                style: config.style,
            },
            ToolKind::Text => return,
        };
        self.is_drawing = true;
        self.last_point = point;
    }

    /// Continue the current drag to `screen`.
    ///
    /// The tool is the one the drag started with. The style is read on every
    /// call, so a style change affects only what is drawn after it.
    pub fn pointer_move(&mut self, screen: Point, config: &ToolConfig) {
        if !self.is_drawing {
            return;
        }
        let Some(buffer) = self.context.as_mut() else {
            return;
        };

        let point = self.view.screen_to_canvas(screen);
        match &mut self.interaction {
            Interaction::Stroke { segments, mask } => {
                let segment = Segment {
                    from: self.last_point,
                    to: point,
                    style: config.style,
                };
                render_segment(buffer, &segment, mask);
                segments.push(segment);
            }
            Interaction::Erase { discs } => {
                let disc = Disc {
                    center: point,
                    diameter: config.style.brush_size() as f64,
                };
                render_disc(buffer, &disc);
                discs.push(disc);
            }
            Interaction::Shape { style, .. } => *style = config.style,
            Interaction::Idle => {}
        }
        self.last_point = point;
    }

    /// End the current drag.
    pub fn pointer_up(&mut self) {
        self.finish_interaction();
    }

    /// The pointer left the surface; ends the current drag.
    pub fn pointer_leave(&mut self) {
        self.finish_interaction();
    }

    /// Reset the buffer to the background fill. View and style are untouched.
    pub fn clear(&mut self) {
        self.apply(Operation::Clear);
    }

    /// Replace the buffer with a template layout.
    pub fn apply_template(&mut self, template: Template) {
        self.apply(Operation::Template(template));
    }

    /// Undo the last operation. Returns true if anything changed.
    pub fn undo(&mut self) -> bool {
        if self.context.is_none() {
            return false;
        }
        self.finish_interaction();
        if !self.log.undo() {
            return false;
        }
        self.context = Some(self.log.replay());
        true
    }

    /// Redo the last undone operation. Returns true if anything changed.
    pub fn redo(&mut self) -> bool {
        self.finish_interaction();
        let Some(buffer) = self.context.as_mut() else {
            return false;
        };
        match self.log.redo() {
            Some(operation) => {
                operation.render(buffer, self.background);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.is_mounted() && (self.log.can_undo() || self.has_pending_operation())
    }

    pub fn can_redo(&self) -> bool {
        self.is_mounted() && self.log.can_redo()
    }

    pub fn history(&self) -> &OperationLog {
        &self.log
    }

    /// Set an absolute zoom in percent. Returns the zoom applied.
    pub fn set_zoom(&mut self, percent: i64) -> u32 {
        self.view.set_zoom(percent)
    }

    /// Change the zoom by `delta` percent. Returns the zoom applied.
    pub fn zoom_by(&mut self, delta: i64) -> u32 {
        self.view.zoom_by(delta)
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.view.toggle_grid()
    }

    /// Encode the buffer as a PNG data URL.
    pub fn export_image(&self) -> Result<String, ExportError> {
        let buffer = self.context.as_ref().ok_or(ExportError::NoContext)?;
        let png = buffer.encode_png()?;
        let url = encode_data_url("image/png", &png);
        if url.len() > MAX_IMAGE_DATA_LEN {
            return Err(ExportError::TooLarge {
                len: url.len(),
                max: MAX_IMAGE_DATA_LEN,
            });
        }
        log::debug!("Exported {}x{} canvas ({} bytes)", self.width, self.height, url.len());
        Ok(url)
    }

    fn apply(&mut self, operation: Operation) {
        self.finish_interaction();
        let Some(buffer) = self.context.as_mut() else {
            return;
        };
        operation.render(buffer, self.background);
        self.log.push(operation);
    }

    fn has_pending_operation(&self) -> bool {
        match &self.interaction {
            Interaction::Stroke { segments, .. } => !segments.is_empty(),
            Interaction::Erase { .. } => true,
            Interaction::Shape { .. } | Interaction::Idle => false,
        }
    }

    /// Close the current drag and record what it drew.
    fn finish_interaction(&mut self) {
        self.is_drawing = false;
        let operation = match std::mem::take(&mut self.interaction) {
            Interaction::Idle => return,
            // A lone click leaves no brush mark.
            Interaction::Stroke { segments, .. } if segments.is_empty() => return,
            Interaction::Stroke { segments, .. } => Operation::Stroke { segments },
            Interaction::Erase { discs } => Operation::Erase { discs },
            Interaction::Shape { tool, anchor, style } => {
                if anchor == self.last_point {
                    return;
                }
                let stamp = Operation::Stamp {
                    tool,
                    anchor,
                    end: self.last_point,
                    style,
                };
                if let Some(buffer) = self.context.as_mut() {
                    stamp.render(buffer, self.background);
                }
                stamp
            }
        };
        self.log.push(operation);
    }
}
