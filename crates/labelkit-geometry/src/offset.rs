//! Stored label offsets.
//!
//! Two schemas exist in saved documents:
//!
//! ```text
//! legacy:     { "x": 40, "y": -20 }                 (optionally "kind": "px")
//! normalized: { "kind": "norm", "dx_norm": 0.05, "dy_norm": -0.05,
//!               "normRef": { "w": 800, "h": 400 }, "version": 2 }
//! ```
//!
//! [`Offset`] models both as a sum type. Serde goes through [`RawOffset`] so
//! that malformed records are rejected at load time instead of surfacing as
//! NaN at draw time.

use labelkit_core::constants::NORMALIZED_OFFSET_VERSION;
use labelkit_core::{Error, Outcome, Size};
use serde::{Deserialize, Serialize};

use crate::normalize::{norm_to_pixel_offset, pixel_offset_to_norm, PixelOffset};

const KIND_PX: &str = "px";
const KIND_NORM: &str = "norm";

/// A label displacement from its anchor center, in one of the two schemas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOffset", into = "RawOffset")]
pub enum Offset {
    /// Image pixels, tied to the resolution the label was placed at.
    Legacy { x: f64, y: f64 },
    /// Fractions of `norm_ref`.
    Normalized(NormOffset),
}

/// A version-2 normalized offset.
///
/// There is no version field: the type itself is the version, so a
/// normalized offset can never be downgraded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormOffset {
    pub dx_norm: f64,
    pub dy_norm: f64,
    pub norm_ref: Size,
}

impl NormOffset {
    pub fn new(dx_norm: f64, dy_norm: f64, norm_ref: Size) -> Self {
        Self {
            dx_norm,
            dy_norm,
            norm_ref,
        }
    }

    /// Normalizes a pixel offset against `norm_ref`.
    pub fn from_pixels(offset: PixelOffset, norm_ref: Size) -> Outcome<Self> {
        pixel_offset_to_norm(offset.dx, offset.dy, norm_ref)
            .map(|n| Self::new(n.dx_norm, n.dy_norm, norm_ref))
    }

    pub fn to_pixels(&self) -> Outcome<PixelOffset> {
        norm_to_pixel_offset(self.dx_norm, self.dy_norm, self.norm_ref)
    }

    pub fn version(&self) -> u8 {
        NORMALIZED_OFFSET_VERSION
    }
}

impl Offset {
    pub fn legacy(x: f64, y: f64) -> Self {
        Offset::Legacy { x, y }
    }

    pub fn normalized(dx_norm: f64, dy_norm: f64, norm_ref: Size) -> Self {
        Offset::Normalized(NormOffset::new(dx_norm, dy_norm, norm_ref))
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, Offset::Normalized(_))
    }

    /// Schema version: 1 for legacy pixel offsets, 2 for normalized ones.
    pub fn version(&self) -> u8 {
        match self {
            Offset::Legacy { .. } => 1,
            Offset::Normalized(norm) => norm.version(),
        }
    }

    /// Resolves to image pixels. Legacy offsets are already pixels.
    pub fn to_pixels(&self) -> Outcome<PixelOffset> {
        match self {
            Offset::Legacy { x, y } => Outcome::clean(PixelOffset::new(*x, *y)),
            Offset::Normalized(norm) => norm.to_pixels(),
        }
    }
}

/// True for the pixel-offset schema.
pub fn is_legacy_offset(offset: &Offset) -> bool {
    matches!(offset, Offset::Legacy { .. })
}

/// Legacy detection on an untyped stored object: a numeric `x` or `y` and
/// either no `kind` or `kind == "px"`.
pub fn is_legacy_record(raw: &serde_json::Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    let has_coord = obj.get("x").is_some_and(|v| v.is_number())
        || obj.get("y").is_some_and(|v| v.is_number());
    let legacy_kind = match obj.get("kind") {
        None => true,
        Some(kind) => kind.as_str() == Some(KIND_PX),
    };
    has_coord && legacy_kind
}

/// True for a well-formed version-2 normalized offset.
pub fn validate_offset_format(offset: &Offset) -> bool {
    match offset {
        Offset::Legacy { .. } => false,
        Offset::Normalized(norm) => {
            norm.dx_norm.is_finite() && norm.dy_norm.is_finite() && norm.norm_ref.is_usable()
        }
    }
}

/// Wire shape shared by both schemas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOffset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx_norm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy_norm: Option<f64>,
    #[serde(rename = "normRef", default, skip_serializing_if = "Option::is_none")]
    pub norm_ref: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
}

impl TryFrom<RawOffset> for Offset {
    type Error = Error;

    fn try_from(raw: RawOffset) -> Result<Self, Self::Error> {
        match raw.kind.as_deref() {
            None | Some(KIND_PX) => {
                if raw.x.is_none() && raw.y.is_none() {
                    return Err(Error::invalid_offset("missing x and y"));
                }
                Ok(Offset::Legacy {
                    x: raw.x.unwrap_or(0.0),
                    y: raw.y.unwrap_or(0.0),
                })
            }
            Some(KIND_NORM) => {
                match raw.version {
                    Some(NORMALIZED_OFFSET_VERSION) => {}
                    Some(v) => {
                        return Err(Error::invalid_offset(format!(
                            "unsupported normalized offset version {}",
                            v
                        )))
                    }
                    None => return Err(Error::invalid_offset("missing version")),
                }
                let (Some(dx_norm), Some(dy_norm)) = (raw.dx_norm, raw.dy_norm) else {
                    return Err(Error::invalid_offset("missing dx_norm or dy_norm"));
                };
                let norm_ref = raw
                    .norm_ref
                    .ok_or_else(|| Error::invalid_offset("missing normRef"))?;
                Ok(Offset::normalized(dx_norm, dy_norm, norm_ref))
            }
            Some(other) => Err(Error::invalid_offset(format!("unknown kind '{}'", other))),
        }
    }
}

impl From<Offset> for RawOffset {
    fn from(offset: Offset) -> Self {
        match offset {
            Offset::Legacy { x, y } => RawOffset {
                x: Some(x),
                y: Some(y),
                ..Default::default()
            },
            Offset::Normalized(norm) => RawOffset {
                kind: Some(KIND_NORM.to_string()),
                dx_norm: Some(norm.dx_norm),
                dy_norm: Some(norm.dy_norm),
                norm_ref: Some(norm.norm_ref),
                version: Some(norm.version()),
                ..Default::default()
            },
        }
    }
}
