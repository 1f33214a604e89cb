//! Pixel buffer and the primitive rasterizers the drawing surface uses.
//!
//! A pixel is covered by a shape when its centre `(x + 0.5, y + 0.5)` lies
//! inside the shape. There is no anti-aliasing, so the same inputs always
//! produce the same pixels.

use crate::color::Rgba;
use kurbo::{Point, Rect};
use thiserror::Error;

/// PNG encoding errors.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
}

/// Per-stroke record of which pixels were already painted.
///
/// A translucent stroke blends each pixel at most once, so overlapping
/// segment caps don't darken the joins.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    width: u32,
    bits: Vec<bool>,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            bits: vec![false; (width * height) as usize],
        }
    }

    /// Mark a pixel. Returns true if it was not marked before.
    fn mark(&mut self, x: u32, y: u32) -> bool {
        let idx = (y * self.width + x) as usize;
        !std::mem::replace(&mut self.bits[idx], true)
    }
}

/// RGBA8 pixel buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    /// Create a buffer uniformly filled with `background`.
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        (x < self.width && y < self.height).then(|| self.pixels[(y * self.width + x) as usize])
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Overwrite every pixel.
    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Overwrite every pixel whose centre lies in `rect`.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let rect = rect.abs();
        self.for_each_covered(rect, |_| true, |px| *px = color);
    }

    /// Blend `color` over every pixel whose centre lies in `rect`.
    pub fn blend_rect(&mut self, rect: Rect, color: Rgba) {
        let rect = rect.abs();
        self.for_each_covered(rect, |_| true, |px| *px = color.over(*px));
    }

    /// Blend `color` over every pixel within `radius` of `center`.
    pub fn blend_disc(&mut self, center: Point, radius: f64, color: Rgba) {
        let bounds = disc_bounds(center, radius);
        let r2 = radius * radius;
        self.for_each_covered(
            bounds,
            |p| (p - center).hypot2() <= r2,
            |px| *px = color.over(*px),
        );
    }

    /// Make every pixel within `radius` of `center` fully transparent.
    pub fn erase_disc(&mut self, center: Point, radius: f64) {
        let bounds = disc_bounds(center, radius);
        let r2 = radius * radius;
        self.for_each_covered(
            bounds,
            |p| (p - center).hypot2() <= r2,
            |px| *px = Rgba::TRANSPARENT,
        );
    }

    /// Blend a round-capped segment of the given `width` from `a` to `b`.
    ///
    /// Pixels already marked in `mask` are skipped, and newly painted pixels
    /// are marked.
    pub fn blend_segment(
        &mut self,
        a: Point,
        b: Point,
        width: f64,
        color: Rgba,
        mask: &mut CoverageMask,
    ) {
        let radius = width / 2.0;
        let bounds = disc_bounds(a, radius).union(disc_bounds(b, radius));
        let r2 = radius * radius;
        let (x0, y0, x1, y1) = self.pixel_range(bounds);
        for y in y0..y1 {
            for x in x0..x1 {
                let p = pixel_center(x, y);
                if segment_distance_sq(p, a, b) <= r2 && mask.mark(x, y) {
                    let idx = (y * self.width + x) as usize;
                    self.pixels[idx] = color.over(self.pixels[idx]);
                }
            }
        }
    }

    /// Raw RGBA8 bytes.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| [p.r, p.g, p.b, p.a])
            .collect()
    }

    /// Encode the buffer as an RGBA8 PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, EncodeError> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.to_rgba_bytes())?;
        }
        Ok(png_data)
    }

    /// Clip a canvas-space rect to a half-open pixel range.
    fn pixel_range(&self, rect: Rect) -> (u32, u32, u32, u32) {
        let clip = |v: f64, max: u32| (v.max(0.0) as u32).min(max);
        // Pixel centres at i + 0.5: the first index whose centre is >= v is
        // ceil(v - 0.5); the range end is floor(v + 0.5) (exclusive of the
        // next centre beyond v).
        let x0 = clip((rect.x0 - 0.5).ceil(), self.width);
        let y0 = clip((rect.y0 - 0.5).ceil(), self.height);
        let x1 = clip((rect.x1 + 0.5).floor(), self.width);
        let y1 = clip((rect.y1 + 0.5).floor(), self.height);
        (x0, y0, x1, y1)
    }

    fn for_each_covered(
        &mut self,
        bounds: Rect,
        inside: impl Fn(Point) -> bool,
        mut apply: impl FnMut(&mut Rgba),
    ) {
        let (x0, y0, x1, y1) = self.pixel_range(bounds);
        for y in y0..y1 {
            for x in x0..x1 {
                let p = pixel_center(x, y);
                if contains_center(bounds, p) && inside(p) {
                    let idx = (y * self.width + x) as usize;
                    apply(&mut self.pixels[idx]);
                }
            }
        }
    }
}

fn pixel_center(x: u32, y: u32) -> Point {
    Point::new(x as f64 + 0.5, y as f64 + 0.5)
}

fn contains_center(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

fn disc_bounds(center: Point, radius: f64) -> Rect {
    Rect::new(
        center.x - radius,
        center.y - radius,
        center.x + radius,
        center.y + radius,
    )
}

/// Squared distance from `p` to the segment `a`-`b`.
pub(crate) fn segment_distance_sq(p: Point, a: Point, b: Point) -> f64 {
    let line_vec = b - a;
    let point_vec = p - a;
    let line_len_sq = line_vec.hypot2();
    if line_len_sq < f64::EPSILON {
        return point_vec.hypot2();
    }
    let t = (point_vec.dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
    let projection = a + line_vec * t;
    (p - projection).hypot2()
}
