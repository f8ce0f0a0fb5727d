//! Fundamental value types.
//!
//! A [`Point`] does not record which coordinate frame it lives in; the frame
//! is fixed by the API that produced it (`to_canvas` yields canvas points,
//! stroke points are always image space).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The origin, also the fallback for invalid geometry.
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    /// Creates a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Length of this point read as a vector from the origin.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Dot product with another vector.
    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product with another vector.
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Scales both components.
    pub fn scale(&self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Width/height pair: an image's natural size, a viewport, or the reference a
/// normalized offset is fractional against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

impl Size {
    /// Creates a new size.
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    /// The fallback reference for images of unknown size.
    pub fn default_reference() -> Self {
        Self::new(
            crate::constants::DEFAULT_REFERENCE_WIDTH,
            crate::constants::DEFAULT_REFERENCE_HEIGHT,
        )
    }

    /// True when both sides are finite and strictly positive.
    pub fn is_usable(&self) -> bool {
        self.w.is_finite() && self.h.is_finite() && self.w > 0.0 && self.h > 0.0
    }

    /// Width and height exchanged, as after a quarter turn.
    pub fn swapped(&self) -> Size {
        Size::new(self.h, self.w)
    }

    /// Geometric center.
    pub fn center(&self) -> Point {
        Point::new(self.w / 2.0, self.h / 2.0)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// The live view transform: image space → canvas device pixels.
///
/// `scale` is CSS pixels per image pixel, `pan_x`/`pan_y` are CSS pixels, and
/// `dpr` is the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub dpr: f64,
}

impl Transform {
    /// Creates a transform from its four components.
    pub fn new(scale: f64, pan_x: f64, pan_y: f64, dpr: f64) -> Self {
        Self {
            scale,
            pan_x,
            pan_y,
            dpr,
        }
    }

    /// Device pixels per image pixel.
    pub fn device_scale(&self) -> f64 {
        self.scale * self.dpr
    }

    /// Pan converted to device pixels and snapped to the pixel grid.
    pub fn snapped_pan(&self) -> Point {
        Point::new(
            (self.pan_x * self.dpr).round(),
            (self.pan_y * self.dpr).round(),
        )
    }

    /// True when the transform can map points in both directions.
    pub fn is_invertible(&self) -> bool {
        let s = self.device_scale();
        s.is_finite() && s > 0.0 && self.pan_x.is_finite() && self.pan_y.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scale: {:.3}x | Pan: ({:.1}, {:.1}) | DPR: {:.2}",
            self.scale, self.pan_x, self.pan_y, self.dpr
        )
    }
}
