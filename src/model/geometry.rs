//! Rectangles in PDF user space and in normalized page space.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing normalized coordinates against bounds.
///
/// Keeps values like `1.0 - 1.1` (which is `-0.10000000000000009` in binary)
/// from counting as an overflow past a `0.1` tolerance.
pub const COORD_EPSILON: f64 = 1e-9;

/// A rectangle in PDF user space (lower-left origin, points).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PdfRect {
    /// Left edge
    pub x: f64,
    /// Bottom edge
    pub y: f64,
    /// Width (non-negative)
    pub width: f64,
    /// Height (non-negative)
    pub height: f64,
}

impl PdfRect {
    /// Create a rectangle from its lower-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two arbitrary corners (as in a PDF `Rect` array).
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// US Letter media box.
    pub fn letter() -> Self {
        Self::new(0.0, 0.0, 612.0, 792.0)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Top edge.
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the rectangle has no area to normalize against.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0) || !self.width.is_finite() || !self.height.is_finite()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &PdfRect) -> PdfRect {
        PdfRect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    /// Union of a sequence of rectangles, `None` when empty.
    pub fn union_all<'a, I>(rects: I) -> Option<PdfRect>
    where
        I: IntoIterator<Item = &'a PdfRect>,
    {
        rects.into_iter().fold(None, |acc, r| match acc {
            None => Some(*r),
            Some(u) => Some(u.union(r)),
        })
    }
}

/// A rectangle as fractions of the page size, top-left origin.
///
/// Coordinates are nominally in `[0, 1]` but may sit slightly outside for
/// placements that bleed off the page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl NormalizedRect {
    /// Create a normalized rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether every edge lies inside the unit square.
    pub fn is_within_page(&self) -> bool {
        self.x >= -COORD_EPSILON
            && self.y >= -COORD_EPSILON
            && self.right() <= 1.0 + COORD_EPSILON
            && self.bottom() <= 1.0 + COORD_EPSILON
    }

    /// Whether any edge lies outside the unit square by more than `tolerance`.
    pub fn overflows(&self, tolerance: f64) -> bool {
        let limit = tolerance + COORD_EPSILON;
        self.x < -limit || self.y < -limit || self.right() > 1.0 + limit || self.bottom() > 1.0 + limit
    }

    /// Clip every edge to the unit square.
    pub fn clamped(&self) -> NormalizedRect {
        let left = self.x.clamp(0.0, 1.0);
        let top = self.y.clamp(0.0, 1.0);
        let right = self.right().clamp(0.0, 1.0);
        let bottom = self.bottom().clamp(0.0, 1.0);
        NormalizedRect::new(left, top, (right - left).max(0.0), (bottom - top).max(0.0))
    }

    /// Approximate equality, for comparing computed geometry.
    pub fn approx_eq(&self, other: &NormalizedRect, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.width - other.width).abs() <= eps
            && (self.height - other.height).abs() <= eps
    }
}
