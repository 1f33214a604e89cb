//! Tool selection and style state.

use crate::color::{ParseColorError, Rgba};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest brush diameter in pixels.
pub const MIN_BRUSH_SIZE: u32 = 1;
/// Largest brush diameter in pixels.
pub const MAX_BRUSH_SIZE: u32 = 50;
/// Lowest opacity, in percent.
pub const MIN_OPACITY: u32 = 10;
/// Highest opacity, in percent.
pub const MAX_OPACITY: u32 = 100;

/// Swatches offered by the tool palette.
pub const QUICK_COLORS: [Rgba; 12] = [
    Rgba::rgb(0xFF, 0x00, 0x00),
    Rgba::rgb(0xFF, 0xFF, 0xFF),
    Rgba::rgb(0x00, 0x00, 0xFF),
    Rgba::rgb(0x00, 0x80, 0x00),
    Rgba::rgb(0xFF, 0xFF, 0x00),
    Rgba::rgb(0x00, 0x00, 0x00),
    Rgba::rgb(0xFF, 0xA5, 0x00),
    Rgba::rgb(0x80, 0x00, 0x80),
    Rgba::rgb(0xFF, 0xC0, 0xCB),
    Rgba::rgb(0xA5, 0x2A, 0x2A),
    Rgba::rgb(0x80, 0x80, 0x80),
    Rgba::rgb(0x00, 0xFF, 0xFF),
];

/// Style errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error(transparent)]
    InvalidColor(#[from] ParseColorError),
}

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Brush,
    Rectangle,
    Circle,
    Line,
    Text,
    Eraser,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Brush,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Line,
        ToolKind::Text,
        ToolKind::Eraser,
    ];

    /// Get display name for this tool.
    pub fn label(self) -> &'static str {
        match self {
            ToolKind::Brush => "Brush",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Circle => "Circle",
            ToolKind::Line => "Line",
            ToolKind::Text => "Text",
            ToolKind::Eraser => "Eraser",
        }
    }

    /// Shape tools stamp once when the drag ends.
    pub fn is_shape(self) -> bool {
        matches!(self, ToolKind::Rectangle | ToolKind::Circle | ToolKind::Line)
    }

    /// Whether the surface does anything with this tool.
    pub fn is_supported(self) -> bool {
        !matches!(self, ToolKind::Text)
    }
}

/// Color, brush size and opacity applied to new drawing operations.
///
/// Setters clamp to the allowed ranges instead of failing; only the color
/// setter can reject input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleState {
    color: Rgba,
    brush_size: u32,
    opacity: u32,
}

impl Default for StyleState {
    fn default() -> Self {
        Self {
            color: Rgba::rgb(0xFF, 0x00, 0x00),
            brush_size: 5,
            opacity: 100,
        }
    }
}

impl StyleState {
    pub fn new(color: Rgba, brush_size: u32, opacity: u32) -> Self {
        let mut style = Self::default();
        style.set_rgba(color);
        style.set_brush_size(brush_size);
        style.set_opacity(opacity);
        style
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn opacity(&self) -> u32 {
        self.opacity
    }

    /// Opacity as a fraction in `[0.1, 1.0]`.
    pub fn alpha(&self) -> f64 {
        self.opacity as f64 / 100.0
    }

    /// Color with the current opacity applied.
    pub fn paint(&self) -> Rgba {
        self.color.with_opacity(self.alpha())
    }

    /// Set the color from a `#RGB`/`#RRGGBB` string. On error the previous
    /// color is kept.
    pub fn set_color(&mut self, hex: &str) -> Result<(), StyleError> {
        self.color = Rgba::from_hex(hex)?;
        Ok(())
    }

    /// Set the color directly. Alpha is ignored; opacity controls it.
    pub fn set_rgba(&mut self, color: Rgba) {
        self.color = Rgba { a: 255, ..color };
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn set_opacity(&mut self, opacity: u32) {
        self.opacity = opacity.clamp(MIN_OPACITY, MAX_OPACITY);
    }
}

/// The configuration a drawing operation runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    pub tool: ToolKind,
    pub style: StyleState,
}

impl ToolConfig {
    pub fn new(tool: ToolKind, style: StyleState) -> Self {
        Self { tool, style }
    }

    /// Same style, different tool.
    pub fn with_tool(self, tool: ToolKind) -> Self {
        Self { tool, ..self }
    }
}

/// Starting layouts offered next to the tool palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "colors", rename_all = "kebab-case")]
pub enum Template {
    /// Background fill only.
    Blank,
    /// Equal-height bands, top to bottom.
    HorizontalStripes(Vec<Rgba>),
    /// Equal-width bands, left to right.
    VerticalStripes(Vec<Rgba>),
}

impl Template {
    pub fn label(&self) -> &'static str {
        match self {
            Template::Blank => "Blank Canvas",
            Template::HorizontalStripes(_) => "Horizontal Stripes",
            Template::VerticalStripes(_) => "Vertical Stripes",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style() {
        let style = StyleState::default();
        assert_eq!(style.color().to_hex(), "#FF0000");
        assert_eq!(style.brush_size(), 5);
        assert_eq!(style.opacity(), 100);
    }

    #[test]
    fn test_brush_size_clamped() {
        let mut style = StyleState::default();
        style.set_brush_size(0);
        assert_eq!(style.brush_size(), 1);
        style.set_brush_size(500);
        assert_eq!(style.brush_size(), 50);
        style.set_brush_size(12);
        assert_eq!(style.brush_size(), 12);
    }

    #[test]
    fn test_opacity_clamped() {
        let mut style = StyleState::default();
        style.set_opacity(0);
        assert_eq!(style.opacity(), 10);
        style.set_opacity(150);
        assert_eq!(style.opacity(), 100);
    }

    #[test]
    fn test_invalid_color_keeps_previous() {
        let mut style = StyleState::default();
        assert!(style.set_color("#00FF00").is_ok());
        assert!(style.set_color("not-a-color").is_err());
        assert_eq!(style.color(), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn test_paint_applies_opacity() {
        let mut style = StyleState::default();
        style.set_opacity(50);
        assert_eq!(style.paint().a, 128);
    }

    #[test]
    fn test_tool_support() {
        assert!(ToolKind::Brush.is_supported());
        assert!(!ToolKind::Text.is_supported());
        assert!(ToolKind::Circle.is_shape());
        assert!(!ToolKind::Eraser.is_shape());
    }

    #[test]
    fn test_tool_serializes_lowercase() {
        let json = serde_json::to_string(&ToolKind::Eraser).unwrap();
        assert_eq!(json, "\"eraser\"");
    }
}
