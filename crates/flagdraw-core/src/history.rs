//! Append-only operation log backing undo and redo.
//!
//! The buffer is always the result of rendering the log, in order, onto the
//! base image. Undo truncates the log and replays it.

use crate::color::Rgba;
use crate::raster::{CoverageMask, PixelBuffer};
use crate::tools::{StyleState, Template, ToolKind};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Maximum number of operations kept for undo.
pub const MAX_UNDO_HISTORY: usize = 100;

/// One brush segment, with the style in effect when it was drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    pub style: StyleState,
}

/// One eraser disc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Disc {
    pub center: Point,
    pub diameter: f64,
}

/// A recorded buffer mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// A brush stroke from pointer-down to pointer-up.
    Stroke { segments: Vec<Segment> },
    /// An eraser drag.
    Erase { discs: Vec<Disc> },
    /// A rectangle, circle or line stamped at the end of a drag.
    Stamp {
        tool: ToolKind,
        anchor: Point,
        end: Point,
        style: StyleState,
    },
    /// Reset to the background fill.
    Clear,
    /// Replace the buffer with a template layout.
    Template(Template),
}

impl Operation {
    /// Render this operation onto `buffer`.
    pub fn render(&self, buffer: &mut PixelBuffer, background: Rgba) {
        match self {
            Operation::Stroke { segments } => {
                let mut mask = CoverageMask::new(buffer.width(), buffer.height());
                for segment in segments {
                    render_segment(buffer, segment, &mut mask);
                }
            }
            Operation::Erase { discs } => {
                for disc in discs {
                    render_disc(buffer, disc);
                }
            }
            Operation::Stamp {
                tool,
                anchor,
                end,
                style,
            } => render_stamp(buffer, *tool, *anchor, *end, style),
            Operation::Clear => buffer.fill(background),
            Operation::Template(template) => render_template(buffer, template, background),
        }
    }
}

pub(crate) fn render_segment(buffer: &mut PixelBuffer, segment: &Segment, mask: &mut CoverageMask) {
    buffer.blend_segment(
        segment.from,
        segment.to,
        segment.style.brush_size() as f64,
        segment.style.paint(),
        mask,
    );
}

pub(crate) fn render_disc(buffer: &mut PixelBuffer, disc: &Disc) {
    buffer.erase_disc(disc.center, disc.diameter / 2.0);
}

fn render_stamp(
    buffer: &mut PixelBuffer,
    tool: ToolKind,
    anchor: Point,
    end: Point,
    style: &StyleState,
) {
    match tool {
        ToolKind::Rectangle => buffer.blend_rect(Rect::from_points(anchor, end), style.paint()),
        ToolKind::Circle => buffer.blend_disc(anchor, anchor.distance(end), style.paint()),
        ToolKind::Line => {
            let mut mask = CoverageMask::new(buffer.width(), buffer.height());
            buffer.blend_segment(
                anchor,
                end,
                style.brush_size() as f64,
                style.paint(),
                &mut mask,
            );
        }
        ToolKind::Brush | ToolKind::Eraser | ToolKind::Text => {
            log::warn!("Ignoring stamp for non-shape tool {:?}", tool);
        }
    }
}

fn render_template(buffer: &mut PixelBuffer, template: &Template, background: Rgba) {
    buffer.fill(background);
    let (colors, horizontal) = match template {
        Template::Blank => return,
        Template::HorizontalStripes(colors) => (colors, true),
        Template::VerticalStripes(colors) => (colors, false),
    };
    if colors.is_empty() {
        return;
    }

    let bounds = buffer.bounds();
    let n = colors.len() as f64;
    for (i, color) in colors.iter().enumerate() {
        let (start, end) = (i as f64 / n, (i + 1) as f64 / n);
        let band = if horizontal {
            Rect::new(0.0, bounds.height() * start, bounds.width(), bounds.height() * end)
        } else {
            Rect::new(bounds.width() * start, 0.0, bounds.width() * end, bounds.height())
        };
        buffer.fill_rect(band, *color);
    }
}

/// Operation log with a redo list.
#[derive(Debug, Clone)]
pub struct OperationLog {
    width: u32,
    height: u32,
    background: Rgba,
    /// Image the log replays onto. Operations folded out of the history are
    /// baked in here.
    base: Option<PixelBuffer>,
    operations: Vec<Operation>,
    redo_stack: Vec<Operation>,
}

impl OperationLog {
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        Self {
            width,
            height,
            background,
            base: None,
            operations: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Record a new operation. Clears the redo list.
    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
        self.redo_stack.clear();

        if self.operations.len() > MAX_UNDO_HISTORY {
            let oldest = self.operations.remove(0);
            let mut base = self.base.take().unwrap_or_else(|| self.blank());
            oldest.render(&mut base, self.background);
            self.base = Some(base);
        }
    }

    /// Drop the last operation. Returns true if undo was performed.
    pub fn undo(&mut self) -> bool {
        match self.operations.pop() {
            Some(operation) => {
                self.redo_stack.push(operation);
                true
            }
            None => false,
        }
    }

    /// Restore the last undone operation, returning it so it can be rendered.
    pub fn redo(&mut self) -> Option<&Operation> {
        let operation = self.redo_stack.pop()?;
        self.operations.push(operation);
        self.operations.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Render the whole log from the base image.
    pub fn replay(&self) -> PixelBuffer {
        let mut buffer = self.base.clone().unwrap_or_else(|| self.blank());
        for operation in &self.operations {
            operation.render(&mut buffer, self.background);
        }
        buffer
    }

    fn blank(&self) -> PixelBuffer {
        PixelBuffer::new(self.width, self.height, self.background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(x: f64) -> Operation {
        Operation::Stamp {
            tool: ToolKind::Rectangle,
            anchor: Point::new(x, 0.0),
            end: Point::new(x + 2.0, 2.0),
            style: StyleState::default(),
        }
    }

    #[test]
    fn test_undo_redo() {
        let mut log = OperationLog::new(10, 10, Rgba::WHITE);
        assert!(!log.can_undo());

        log.push(stamp(0.0));
        log.push(stamp(4.0));
        assert!(log.undo());
        assert_eq!(log.len(), 1);
        assert!(log.can_redo());

        assert_eq!(log.redo(), Some(&stamp(4.0)));
        assert_eq!(log.len(), 2);
        assert!(!log.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut log = OperationLog::new(10, 10, Rgba::WHITE);
        log.push(stamp(0.0));
        log.undo();
        log.push(stamp(4.0));
        assert!(!log.can_redo());
    }

    #[test]
    fn test_undo_empty() {
        let mut log = OperationLog::new(10, 10, Rgba::WHITE);
        assert!(!log.undo());
        assert!(log.redo().is_none());
    }

    #[test]
    fn test_history_is_capped_and_replay_stays_exact() {
        let mut log = OperationLog::new(400, 4, Rgba::WHITE);
        let mut expected = PixelBuffer::new(400, 4, Rgba::WHITE);
        for i in 0..(MAX_UNDO_HISTORY + 10) {
            let op = stamp((i * 3) as f64);
            op.render(&mut expected, Rgba::WHITE);
            log.push(op);
        }
        assert_eq!(log.len(), MAX_UNDO_HISTORY);
        assert_eq!(log.replay(), expected);
    }

    #[test]
    fn test_horizontal_stripes() {
        let mut buffer = PixelBuffer::new(6, 6, Rgba::WHITE);
        let red = Rgba::rgb(255, 0, 0);
        let blue = Rgba::rgb(0, 0, 255);
        Operation::Template(Template::HorizontalStripes(vec![red, Rgba::WHITE, blue]))
            .render(&mut buffer, Rgba::WHITE);
        assert_eq!(buffer.pixel(3, 0), Some(red));
        assert_eq!(buffer.pixel(3, 1), Some(red));
        assert_eq!(buffer.pixel(3, 2), Some(Rgba::WHITE));
        assert_eq!(buffer.pixel(3, 5), Some(blue));
    }

    #[test]
    fn test_vertical_stripes() {
        let mut buffer = PixelBuffer::new(4, 2, Rgba::WHITE);
        let green = Rgba::rgb(0, 128, 0);
        Operation::Template(Template::VerticalStripes(vec![green, Rgba::BLACK]))
            .render(&mut buffer, Rgba::WHITE);
        assert_eq!(buffer.pixel(1, 1), Some(green));
        assert_eq!(buffer.pixel(2, 0), Some(Rgba::BLACK));
    }

    #[test]
    fn test_circle_stamp_radius_is_drag_distance() {
        let mut buffer = PixelBuffer::new(20, 20, Rgba::WHITE);
        let op = Operation::Stamp {
            tool: ToolKind::Circle,
            anchor: Point::new(10.0, 10.0),
            end: Point::new(14.0, 10.0),
            style: StyleState::default(),
        };
        op.render(&mut buffer, Rgba::WHITE);
        assert_eq!(buffer.pixel(12, 9), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(buffer.pixel(15, 9), Some(Rgba::WHITE));
    }
}
