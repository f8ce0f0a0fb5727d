//! Image ↔ canvas coordinate conversion.
//!
//! Image coordinates are in the unscaled source image's pixel grid. Canvas
//! coordinates are device pixels on the rendered surface.
//!
//! The mapping accounts for:
//! - Pan offset (translation, snapped to the device pixel grid)
//! - Scale (CSS pixels per image pixel)
//! - Device pixel ratio
//!
//! Formula:
//! ```text
//! canvas = round(image * scale * dpr + round(pan * dpr))
//! image  = (canvas - round(pan * dpr)) / (scale * dpr)
//! ```

use std::fmt;
use std::str::FromStr;

use labelkit_core::{GeometryWarning, Outcome, Point, Size, Transform};
use serde::{Deserialize, Serialize};

/// Converts an image-space point to canvas device pixels.
///
/// The pan is snapped to whole device pixels before it is added so that
/// adjacent elements never straddle a pixel seam. Invalid input yields the
/// origin with a warning.
pub fn to_canvas(p_img: Point, t: &Transform) -> Outcome<Point> {
    if let Some(warning) = check_inputs(&p_img, t) {
        return Outcome::warned(Point::ORIGIN, warning);
    }

    let s = t.device_scale();
    let pan = t.snapped_pan();
    Outcome::clean(Point::new(
        (p_img.x * s + pan.x).round(),
        (p_img.y * s + pan.y).round(),
    ))
}

/// Converts a canvas device-pixel point back to image space.
///
/// This is the exact inverse of the unrounded forward mapping and is not
/// rounded itself, so it is suitable for hit-testing.
pub fn to_image(p_canvas: Point, t: &Transform) -> Outcome<Point> {
    if let Some(warning) = check_inputs(&p_canvas, t) {
        return Outcome::warned(Point::ORIGIN, warning);
    }

    let s = t.device_scale();
    let pan = t.snapped_pan();
    Outcome::clean(Point::new((p_canvas.x - pan.x) / s, (p_canvas.y - pan.y) / s))
}

fn check_inputs(p: &Point, t: &Transform) -> Option<GeometryWarning> {
    if !p.is_finite() {
        return Some(GeometryWarning::InvalidPoint { x: p.x, y: p.y });
    }
    if !t.is_invertible() {
        return Some(GeometryWarning::InvalidTransform {
            reason: t.to_string(),
        });
    }
    None
}

/// Which viewport dimension an image is fitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fill the viewport width
    Width,
    /// Fill the viewport height
    Height,
    /// Fit entirely inside the viewport
    #[default]
    Contain,
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Width => write!(f, "width"),
            Self::Height => write!(f, "height"),
            Self::Contain => write!(f, "contain"),
        }
    }
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "width" => Ok(Self::Width),
            "height" => Ok(Self::Height),
            "contain" => Ok(Self::Contain),
            _ => Err(format!("Unknown fit mode: {}", s)),
        }
    }
}

/// Deterministic scale that fits an image of `natural` size into a viewport
/// measured in CSS pixels.
pub fn compute_scale_for_fit(natural: Size, viewport_css: Size, mode: FitMode) -> Outcome<f64> {
    if !natural.is_usable() {
        return Outcome::warned(
            1.0,
            GeometryWarning::InvalidReference {
                w: natural.w,
                h: natural.h,
            },
        );
    }
    if !viewport_css.is_usable() {
        return Outcome::warned(
            1.0,
            GeometryWarning::InvalidReference {
                w: viewport_css.w,
                h: viewport_css.h,
            },
        );
    }

    let by_width = viewport_css.w / natural.w;
    let by_height = viewport_css.h / natural.h;
    Outcome::clean(match mode {
        FitMode::Width => by_width,
        FitMode::Height => by_height,
        FitMode::Contain => by_width.min(by_height),
    })
}
