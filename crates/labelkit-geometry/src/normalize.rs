//! Pixel ↔ normalized offset conversion.
//!
//! A normalized offset expresses a label displacement as a fraction of an
//! image's natural size, so it survives the image being displayed or
//! re-exported at a different resolution.

use labelkit_core::{GeometryWarning, Outcome, Point, Size};
use serde::{Deserialize, Serialize};

/// Label displacement in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelOffset {
    pub dx: f64,
    pub dy: f64,
}

impl PixelOffset {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn as_vector(&self) -> Point {
        Point::new(self.dx, self.dy)
    }

    pub fn from_vector(v: Point) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Label displacement as a fraction of a reference size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedOffset {
    pub dx_norm: f64,
    pub dy_norm: f64,
}

impl NormalizedOffset {
    pub fn new(dx_norm: f64, dy_norm: f64) -> Self {
        Self { dx_norm, dy_norm }
    }
}

fn check_reference(reference: Option<Size>) -> Result<Size, GeometryWarning> {
    match reference {
        Some(size) if size.is_usable() => Ok(size),
        Some(size) => Err(GeometryWarning::InvalidReference {
            w: size.w,
            h: size.h,
        }),
        None => Err(GeometryWarning::InvalidReference { w: 0.0, h: 0.0 }),
    }
}

/// Divides a pixel offset by the reference size.
///
/// A missing or zero-sized reference yields a zero offset with a warning
/// rather than letting NaN reach the renderer.
pub fn pixel_offset_to_norm(
    dx_px: f64,
    dy_px: f64,
    reference: impl Into<Option<Size>>,
) -> Outcome<NormalizedOffset> {
    let size = match check_reference(reference.into()) {
        Ok(size) => size,
        Err(warning) => return Outcome::warned(NormalizedOffset::default(), warning),
    };
    if !(dx_px.is_finite() && dy_px.is_finite()) {
        return Outcome::warned(
            NormalizedOffset::default(),
            GeometryWarning::InvalidPoint { x: dx_px, y: dy_px },
        );
    }

    Outcome::clean(NormalizedOffset::new(dx_px / size.w, dy_px / size.h))
}

/// Multiplies a normalized offset by the reference size.
pub fn norm_to_pixel_offset(
    dx_norm: f64,
    dy_norm: f64,
    reference: impl Into<Option<Size>>,
) -> Outcome<PixelOffset> {
    let size = match check_reference(reference.into()) {
        Ok(size) => size,
        Err(warning) => return Outcome::warned(PixelOffset::default(), warning),
    };
    if !(dx_norm.is_finite() && dy_norm.is_finite()) {
        return Outcome::warned(
            PixelOffset::default(),
            GeometryWarning::InvalidPoint {
                x: dx_norm,
                y: dy_norm,
            },
        );
    }

    Outcome::clean(PixelOffset::new(dx_norm * size.w, dy_norm * size.h))
}
