//! Geometry primitives shared by the layout solver, compositor, and pointer controller.
//!
//! All real-valued coordinates are full-resolution canvas pixels with
//! `(0.0, 0.0)` at the top-left corner.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// The center point of this rectangle.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Check if a point is within this rectangle (edges inclusive).
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Whether every coordinate is finite and the size is non-negative.
    pub fn is_drawable(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.w.is_finite()
            && self.h.is_finite()
            && self.w > 0.0
            && self.h > 0.0
    }
}

/// A 2D point in canvas or screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const ORIGIN: Point2D = Point2D { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    pub fn delta_from(&self, other: &Point2D) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }

    /// Divide both components by `zoom`, mapping screen pixels to canvas pixels.
    pub fn unzoom(&self, zoom: f64) -> Point2D {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        Point2D {
            x: self.x / zoom,
            y: self.y / zoom,
        }
    }

    /// Rotate around `center` by `degrees` (clockwise in screen space, y down).
    pub fn rotate_around(&self, center: &Point2D, degrees: f64) -> Point2D {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point2D {
            x: center.x + dx * cos - dy * sin,
            y: center.y + dx * sin + dy * cos,
        }
    }
}

/// Integer pixel dimensions of a destination surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Create a size, clamping both sides to at least one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Round real-valued canvas dimensions to whole pixels (at least 1).
    pub fn from_f64(width: f64, height: f64) -> Self {
        Self::new(to_pixels(width), to_pixels(height))
    }

    /// Dimensions as floats.
    pub fn as_f64(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }

    /// The longer side.
    pub fn long_edge(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Size shown on screen at the given zoom.
    pub fn scaled(&self, zoom: f64) -> (f64, f64) {
        (self.width as f64 * zoom, self.height as f64 * zoom)
    }
}

fn to_pixels(value: f64) -> u32 {
    if !value.is_finite() || value < 1.0 {
        return 1;
    }
    value.round().min(u32::MAX as f64) as u32
}

/// An integer rectangle in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether this rectangle covers an entire `width x height` image.
    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }

    /// Size after adding `margin` pixels on all four sides.
    pub fn inflated_size(&self, margin: u32) -> (u32, u32) {
        (
            self.width.saturating_add(margin.saturating_mul(2)),
            self.height.saturating_add(margin.saturating_mul(2)),
        )
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.x as f64,
            self.y as f64,
            self.width as f64,
            self.height as f64,
        )
    }
}
