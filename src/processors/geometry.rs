//! Geometric primitives for detection output.
//!
//! This module provides the point, box and line types produced by the
//! decoders, plus the rescale-and-clip policy that maps them from heatmap
//! coordinates back into original image coordinates.

use crate::processors::types::LineOrientation;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Per-axis factors that map heatmap coordinates to original image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    /// Horizontal factor, `original_width / map_width`.
    pub x: f32,
    /// Vertical factor, `original_height / map_height`.
    pub y: f32,
    /// Original width, used as the clip bound on x.
    pub bound_width: f32,
    /// Original height, used as the clip bound on y.
    pub bound_height: f32,
}

impl ScaleFactors {
    /// Builds the factors for a `map_size` heatmap of an `original_size` image.
    ///
    /// Both sizes are `(width, height)`. Returns `None` if the map size has a
    /// zero dimension.
    pub fn new(map_size: (u32, u32), original_size: (u32, u32)) -> Option<Self> {
        let (map_w, map_h) = map_size;
        if map_w == 0 || map_h == 0 {
            return None;
        }
        let (orig_w, orig_h) = original_size;
        Some(Self {
            x: orig_w as f32 / map_w as f32,
            y: orig_h as f32 / map_h as f32,
            bound_width: orig_w as f32,
            bound_height: orig_h as f32,
        })
    }

    #[inline]
    fn map_x(&self, x: f32) -> f32 {
        (x * self.x).clamp(0.0, self.bound_width)
    }

    #[inline]
    fn map_y(&self, y: f32) -> f32 {
        (y * self.y).clamp(0.0, self.bound_height)
    }
}

/// An axis-aligned text region in pixel coordinates.
///
/// A well-formed box satisfies `x_min < x_max` and `y_min < y_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    /// Left edge.
    pub x_min: f32,
    /// Top edge.
    pub y_min: f32,
    /// Right edge (exclusive).
    pub x_max: f32,
    /// Bottom edge (exclusive).
    pub y_max: f32,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
}

impl TextBox {
    /// Creates a box from its edges and confidence.
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32, confidence: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
            confidence,
        }
    }

    /// Width of the box.
    #[inline]
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    /// Height of the box.
    #[inline]
    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Returns `true` if the box has no positive extent on some axis.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Returns `true` if `other` lies entirely within this box (edges may touch).
    pub fn contains(&self, other: &TextBox) -> bool {
        self.x_min <= other.x_min
            && self.y_min <= other.y_min
            && self.x_max >= other.x_max
            && self.y_max >= other.y_max
    }

    /// Returns `true` if every edge lies within `[0, width] x [0, height]`.
    pub fn within_bounds(&self, width: u32, height: u32) -> bool {
        self.x_min >= 0.0
            && self.y_min >= 0.0
            && self.x_max <= width as f32
            && self.y_max <= height as f32
    }

    /// Maps the box into original image coordinates and clips it to the image.
    pub fn rescaled(&self, scale: &ScaleFactors) -> TextBox {
        TextBox {
            x_min: scale.map_x(self.x_min),
            y_min: scale.map_y(self.y_min),
            x_max: scale.map_x(self.x_max),
            y_max: scale.map_y(self.y_max),
            confidence: self.confidence,
        }
    }
}

/// A straight segment that is either vertical or horizontal.
///
/// Vertical lines keep `start.x == end.x` with `start.y < end.y`; horizontal
/// lines keep `start.y == end.y` with `start.x < end.x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Start point (top for vertical, left for horizontal).
    pub start: Point,
    /// End point (bottom for vertical, right for horizontal).
    pub end: Point,
    /// Which axis the line runs along.
    pub orientation: LineOrientation,
}

impl Line {
    /// A vertical line at `x` from `y_start` to `y_end`.
    pub fn vertical(x: f32, y_start: f32, y_end: f32) -> Self {
        let (lo, hi) = if y_start <= y_end {
            (y_start, y_end)
        } else {
            (y_end, y_start)
        };
        Self {
            start: Point::new(x, lo),
            end: Point::new(x, hi),
            orientation: LineOrientation::Vertical,
        }
    }

    /// A horizontal line at `y` from `x_start` to `x_end`.
    pub fn horizontal(y: f32, x_start: f32, x_end: f32) -> Self {
        let (lo, hi) = if x_start <= x_end {
            (x_start, x_end)
        } else {
            (x_end, x_start)
        };
        Self {
            start: Point::new(lo, y),
            end: Point::new(hi, y),
            orientation: LineOrientation::Horizontal,
        }
    }

    /// The constant coordinate: x for vertical lines, y for horizontal ones.
    pub fn cross(&self) -> f32 {
        match self.orientation {
            LineOrientation::Vertical => self.start.x,
            LineOrientation::Horizontal => self.start.y,
        }
    }

    /// The `(start, end)` interval along the line's axis.
    pub fn span(&self) -> (f32, f32) {
        match self.orientation {
            LineOrientation::Vertical => (self.start.y, self.end.y),
            LineOrientation::Horizontal => (self.start.x, self.end.x),
        }
    }

    /// Length along the line's axis.
    pub fn length(&self) -> f32 {
        let (lo, hi) = self.span();
        hi - lo
    }

    /// Rebuilds a line of the same orientation from a cross coordinate and span.
    pub fn with_cross_and_span(orientation: LineOrientation, cross: f32, lo: f32, hi: f32) -> Self {
        match orientation {
            LineOrientation::Vertical => Line::vertical(cross, lo, hi),
            LineOrientation::Horizontal => Line::horizontal(cross, lo, hi),
        }
    }

    /// Maps the line into original image coordinates and clips it to the image.
    pub fn rescaled(&self, scale: &ScaleFactors) -> Line {
        let start = Point::new(scale.map_x(self.start.x), scale.map_y(self.start.y));
        let end = Point::new(scale.map_x(self.end.x), scale.map_y(self.end.y));
        Line {
            start,
            end,
            orientation: self.orientation,
        }
    }
}
