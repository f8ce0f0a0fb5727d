//! Rotate and flip of image content.
//!
//! A content transform moves the strokes themselves, so every stored label
//! representation must follow:
//!
//! 1. stroke points (absolute image-space points)
//! 2. absolute label positions (points) and label offsets (vectors)
//! 3. relative-position-backed offsets, re-derived from the new geometry
//!    when the relative position still reproduces the stored offset
//! 4. the image's anchor cache
//! 5. the cumulative rotation and per-stroke rotation stamps
//!
//! Rotations are restricted to multiples of 90 degrees; sines and cosines of
//! quarter turns are exact so four rotations return every point unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use labelkit_core::{GeometryWarning, Outcome, Point, Result, Size};
use serde::{Deserialize, Serialize};

use crate::anchor::compute_anchor_center_image;
use crate::context::GeometryContext;
use crate::normalize::PixelOffset;
use crate::offset::{NormOffset, Offset};
use crate::relative::{decode_relative_position, encode_relative_position, RelativePosition};
use crate::store::{AnnotationStore, ImageRecord};
use crate::stroke::Stroke;

/// Mirror axis of a flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipDirection {
    /// Mirror left-right (x changes)
    Horizontal,
    /// Mirror top-bottom (y changes)
    Vertical,
}

impl fmt::Display for FlipDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
        }
    }
}

impl FromStr for FlipDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "horizontal" | "h" => Ok(Self::Horizontal),
            "vertical" | "v" => Ok(Self::Vertical),
            _ => Err(format!("Unknown flip direction: {}", s)),
        }
    }
}

/// A content operation on one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContentTransform {
    /// Rotation in degrees; positive is clockwise on screen
    Rotate(f64),
    Flip(FlipDirection),
}

impl fmt::Display for ContentTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rotate(degrees) => write!(f, "rotate {}°", degrees),
            Self::Flip(direction) => write!(f, "flip {}", direction),
        }
    }
}

/// Exact `(sin, cos)` for a multiple of 90 degrees.
fn quarter_turn(degrees: f64) -> Option<(f64, f64)> {
    let turns = quarter_turns(degrees)?;
    Some(match turns.rem_euclid(4) {
        0 => (0.0, 1.0),
        1 => (1.0, 0.0),
        2 => (0.0, -1.0),
        _ => (-1.0, 0.0),
    })
}

fn quarter_turns(degrees: f64) -> Option<i64> {
    if !degrees.is_finite() {
        return None;
    }
    let turns = degrees / 90.0;
    if (turns - turns.round()).abs() > 1e-9 {
        return None;
    }
    Some(turns.round() as i64)
}

/// True when the rotation exchanges width and height.
fn swaps_axes(degrees: f64) -> bool {
    quarter_turns(degrees).is_some_and(|turns| turns.rem_euclid(2) == 1)
}

fn clamp_to(v: f64, extent: f64) -> f64 {
    v.min(extent - 1.0).max(0.0)
}

/// Rotates an absolute point by a multiple of 90 degrees.
///
/// The pivot is `custom_center` or the image center. For quarter turns of an
/// image whose dimensions swap, the point is re-centered in the swapped
/// frame; with `keep_dimensions` or a custom center the pivot stays put.
/// Unless `keep_dimensions` is set, the result is clamped to the
/// post-rotation bounds.
pub fn rotate_coordinates(
    x: f64,
    y: f64,
    degrees: f64,
    w: f64,
    h: f64,
    custom_center: Option<Point>,
    keep_dimensions: bool,
) -> Outcome<Point> {
    if !(x.is_finite() && y.is_finite()) {
        return Outcome::warned(Point::ORIGIN, GeometryWarning::InvalidPoint { x, y });
    }
    let Some((sin, cos)) = quarter_turn(degrees) else {
        return Outcome::warned(
            Point::new(x, y),
            GeometryWarning::UnsupportedRotation { degrees },
        );
    };

    let center = custom_center.unwrap_or(Point::new(w / 2.0, h / 2.0));
    let tx = x - center.x;
    let ty = y - center.y;
    let rx = tx * cos - ty * sin;
    let ry = tx * sin + ty * cos;

    let swapped = swaps_axes(degrees) && !keep_dimensions;
    let new_center = if swapped && custom_center.is_none() {
        Point::new(h / 2.0, w / 2.0)
    } else {
        center
    };
    let (final_w, final_h) = if swapped { (h, w) } else { (w, h) };

    let mut out = Point::new(rx + new_center.x, ry + new_center.y);
    if !keep_dimensions {
        out = Point::new(clamp_to(out.x, final_w), clamp_to(out.y, final_h));
    }
    Outcome::clean(out)
}

/// Mirrors an absolute point, then clamps it to the image bounds.
pub fn flip_coordinates(
    x: f64,
    y: f64,
    direction: FlipDirection,
    w: f64,
    h: f64,
) -> Outcome<Point> {
    if !(x.is_finite() && y.is_finite()) {
        return Outcome::warned(Point::ORIGIN, GeometryWarning::InvalidPoint { x, y });
    }
    let (fx, fy) = match direction {
        FlipDirection::Horizontal => (w - x, y),
        FlipDirection::Vertical => (x, h - y),
    };
    Outcome::clean(Point::new(clamp_to(fx, w), clamp_to(fy, h)))
}

/// Rotates a relative vector about the origin. Never used for absolute
/// points.
pub fn rotate_offset_vector(x: f64, y: f64, degrees: f64) -> Outcome<Point> {
    if !(x.is_finite() && y.is_finite()) {
        return Outcome::warned(Point::ORIGIN, GeometryWarning::InvalidPoint { x, y });
    }
    let (sin, cos) = match quarter_turn(degrees) {
        Some(exact) => exact,
        None if degrees.is_finite() => degrees.to_radians().sin_cos(),
        None => {
            return Outcome::warned(
                Point::new(x, y),
                GeometryWarning::UnsupportedRotation { degrees },
            )
        }
    };
    Outcome::clean(Point::new(x * cos - y * sin, x * sin + y * cos))
}

/// Mirrors a relative vector.
pub fn flip_offset_vector(x: f64, y: f64, direction: FlipDirection) -> Point {
    match direction {
        FlipDirection::Horizontal => Point::new(-x, y),
        FlipDirection::Vertical => Point::new(x, -y),
    }
}

/// Mean of every finite point across the strokes.
pub fn drawing_centroid<'a>(strokes: impl IntoIterator<Item = &'a Stroke>) -> Option<Point> {
    let (sum, count) = strokes
        .into_iter()
        .flat_map(Stroke::finite_points)
        .fold((Point::ORIGIN, 0usize), |(sum, n), p| (sum + p, n + 1));
    (count > 0).then(|| sum.scale(1.0 / count as f64))
}

/// Wraps an angle in radians into (-π, π].
pub fn normalize_angle(radians: f64) -> f64 {
    let wrapped = radians.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// What [`apply_content_transform`] changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTransformReport {
    pub transform: ContentTransform,
    /// False when the transform was rejected and nothing changed
    pub applied: bool,
    pub strokes: usize,
    pub points: usize,
    pub absolute_positions: usize,
    pub offsets: usize,
    pub relative_rederived: usize,
    /// Relative positions that did not match their offset; the transformed
    /// offset was kept and the relative position re-encoded from it
    pub relative_kept: usize,
    pub warnings: Vec<GeometryWarning>,
}

impl ContentTransformReport {
    fn new(transform: ContentTransform) -> Self {
        Self {
            transform,
            applied: false,
            strokes: 0,
            points: 0,
            absolute_positions: 0,
            offsets: 0,
            relative_rederived: 0,
            relative_kept: 0,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, warning: GeometryWarning) {
        tracing::warn!(target: "labelkit::geometry", "{}", warning);
        self.warnings.push(warning);
    }
}

/// How points and vectors move under one transform of one image.
struct Mapping {
    transform: ContentTransform,
    dims: Size,
    pivot: Option<Point>,
    keep_dimensions: bool,
}

impl Mapping {
    fn point(&self, p: Point) -> Outcome<Point> {
        match self.transform {
            ContentTransform::Rotate(degrees) => rotate_coordinates(
                p.x,
                p.y,
                degrees,
                self.dims.w,
                self.dims.h,
                self.pivot,
                self.keep_dimensions,
            ),
            ContentTransform::Flip(direction) => {
                flip_coordinates(p.x, p.y, direction, self.dims.w, self.dims.h)
            }
        }
    }

    fn vector(&self, v: Point) -> Outcome<Point> {
        match self.transform {
            ContentTransform::Rotate(degrees) => rotate_offset_vector(v.x, v.y, degrees),
            ContentTransform::Flip(direction) => {
                Outcome::clean(flip_offset_vector(v.x, v.y, direction))
            }
        }
    }

    /// Whether normalization references swap width and height.
    fn swaps_reference(&self) -> bool {
        match self.transform {
            ContentTransform::Rotate(degrees) => swaps_axes(degrees) && !self.keep_dimensions,
            ContentTransform::Flip(_) => false,
        }
    }

    fn offset(&self, offset: &Offset) -> Outcome<Offset> {
        match offset {
            Offset::Legacy { x, y } => self
                .vector(Point::new(*x, *y))
                .map(|v| Offset::legacy(v.x, v.y)),
            Offset::Normalized(norm) => {
                let reference = if self.swaps_reference() {
                    norm.norm_ref.swapped()
                } else {
                    norm.norm_ref
                };
                norm.to_pixels()
                    .and_then(|px| self.vector(px.as_vector()))
                    .and_then(|v| NormOffset::from_pixels(PixelOffset::from_vector(v), reference))
                    .map(Offset::Normalized)
            }
        }
    }
}

/// Applies a rotate or flip to one image and everything anchored to it.
///
/// Rotations that are not a multiple of 90 degrees are rejected with a
/// warning and leave the image untouched.
pub fn apply_content_transform(
    ctx: &mut GeometryContext,
    store: &mut AnnotationStore,
    image: &str,
    transform: ContentTransform,
) -> Result<ContentTransformReport> {
    let fallback = ctx.config().migration.default_reference;
    let record = store.image_mut(image)?;
    let mut report = ContentTransformReport::new(transform);

    let delta = match transform {
        ContentTransform::Rotate(degrees) => {
            if quarter_turns(degrees).is_none() {
                report.warn(GeometryWarning::UnsupportedRotation { degrees });
                return Ok(report);
            }
            degrees.to_radians()
        }
        ContentTransform::Flip(_) => 0.0,
    };

    let natural = record.usable_natural();
    let dims = match natural {
        Some(size) => size,
        None => {
            report.warn(GeometryWarning::MissingDimensions {
                image: image.to_string(),
            });
            fallback
        }
    };

    let keep_dimensions = !record.has_bitmap;
    let pivot = match transform {
        ContentTransform::Rotate(_) if keep_dimensions => Some(rotation_pivot(record, dims)),
        _ => None,
    };
    let mapping = Mapping {
        transform,
        dims,
        pivot,
        keep_dimensions,
    };
    let new_natural = natural.map(|size| {
        if mapping.swaps_reference() {
            size.swapped()
        } else {
            size
        }
    });

    let ImageRecord {
        strokes,
        label_offsets,
        absolute_positions,
        relative_positions,
        offset_rotation_stamps,
        ..
    } = &mut *record;

    // Checked before anything moves
    let mismatched: BTreeSet<String> = relative_positions
        .iter()
        .filter(|(label, rel)| {
            strokes
                .get(*label)
                .is_some_and(|stroke| !reproduces_offset(stroke, label_offsets.get(*label), rel))
        })
        .map(|(label, _)| label.clone())
        .collect();

    // 1. stroke points
    for stroke in strokes.values_mut() {
        for p in stroke.points.iter_mut().filter(|p| p.is_finite()) {
            *p = mapping.point(*p).collect_into(&mut report.warnings);
            report.points += 1;
        }
        report.strokes += 1;
    }

    // 2. absolute positions and offset vectors
    for position in absolute_positions.values_mut() {
        *position = mapping.point(*position).collect_into(&mut report.warnings);
        report.absolute_positions += 1;
    }
    for offset in label_offsets.values_mut() {
        *offset = mapping.offset(offset).collect_into(&mut report.warnings);
        report.offsets += 1;
    }

    // 3. relative positions against the new geometry
    for (label, rel) in relative_positions.iter_mut() {
        if matches!(transform, ContentTransform::Flip(_)) {
            *rel = rel.mirrored();
        }
        let Some(stroke) = strokes.get(label) else {
            continue;
        };
        let anchor = compute_anchor_center_image(stroke).collect_into(&mut report.warnings);
        if mismatched.contains(label) {
            if let Some(offset) = label_offsets.get(label) {
                let px = offset.to_pixels().collect_into(&mut report.warnings);
                *rel = encode_relative_position(stroke, anchor, px)
                    .collect_into(&mut report.warnings);
            }
            tracing::debug!("Kept transformed offset for {}/{}", image, label);
            report.relative_kept += 1;
            continue;
        }
        let px = decode_relative_position(stroke, anchor, rel).collect_into(&mut report.warnings);

        let reference = match (new_natural, label_offsets.get(label)) {
            (Some(size), _) => Some(size),
            (None, Some(Offset::Normalized(norm))) => Some(norm.norm_ref),
            (None, _) => None,
        };
        let rederived = match reference {
            Some(reference) => NormOffset::from_pixels(px, reference)
                .map(Offset::Normalized)
                .collect_into(&mut report.warnings),
            None => Offset::legacy(px.dx, px.dy),
        };
        label_offsets.insert(label.clone(), rederived);
        report.relative_rederived += 1;
    }

    // 4. anchors
    ctx.anchors_mut().invalidate_anchor_cache(image);

    // 5. rotation accumulators
    if matches!(transform, ContentTransform::Rotate(_)) {
        record_rotation(label_offsets.keys(), offset_rotation_stamps, delta);
    }
    record.rotation = normalize_angle(record.rotation + delta);
    if record.has_bitmap {
        record.natural = new_natural.or(record.natural);
    }

    report.applied = true;
    tracing::debug!(
        "Applied {} to {}: {} stroke(s), {} offset(s), {} relative, {} kept",
        transform,
        image,
        report.strokes,
        report.offsets,
        report.relative_rederived,
        report.relative_kept
    );
    Ok(report)
}

/// Largest gap, in image pixels, between a decoded relative position and the
/// stored offset for the two to count as the same placement.
const RELATIVE_MATCH_TOLERANCE: f64 = 0.5;

/// True when `rel` decodes to the stored offset on the stroke's current
/// geometry. Without a usable stored offset the relative position stands.
fn reproduces_offset(stroke: &Stroke, offset: Option<&Offset>, rel: &RelativePosition) -> bool {
    let Some((stored, None)) = offset.map(|o| o.to_pixels().into_parts()) else {
        return true;
    };
    let (anchor, _) = compute_anchor_center_image(stroke).into_parts();
    let (decoded, _) = decode_relative_position(stroke, anchor, rel).into_parts();
    (decoded.as_vector() - stored.as_vector()).length() <= RELATIVE_MATCH_TOLERANCE
}

/// Pivot for bitmap-less content. The drawing centroid is captured on the
/// first rotation and reused afterwards so repeated turns do not orbit.
fn rotation_pivot(record: &mut ImageRecord, dims: Size) -> Point {
    if let Some(pivot) = record.rotation_pivot {
        return pivot;
    }
    match drawing_centroid(record.strokes.values()) {
        Some(centroid) => {
            tracing::debug!("Rotation pivot fixed at {}", centroid);
            record.rotation_pivot = Some(centroid);
            centroid
        }
        None => dims.center(),
    }
}

fn record_rotation<'a>(
    labels: impl Iterator<Item = &'a String>,
    stamps: &mut BTreeMap<String, f64>,
    delta: f64,
) {
    for label in labels {
        let stamp = stamps.entry(label.clone()).or_insert(0.0);
        *stamp = normalize_angle(*stamp + delta);
    }
}
