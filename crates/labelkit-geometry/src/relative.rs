//! Rotation-resistant label placement.
//!
//! A [`RelativePosition`] stores where along its stroke a label sits and how
//! far it stands off the path, rather than a fixed dx/dy. Re-walking those
//! two numbers against rotated stroke points reproduces the same visual
//! relationship without rotating the offset itself.
//!
//! The side convention is image space with y pointing down: for a path
//! tangent `t` the positive side is the normal `(-t.y, t.x)`.

use labelkit_core::{GeometryWarning, Outcome, Point};
use serde::{Deserialize, Serialize};

use crate::normalize::PixelOffset;
use crate::stroke::Stroke;

/// Nominal tangent used when a stroke has no direction.
const NOMINAL_TANGENT: Point = Point { x: 1.0, y: 0.0 };

/// Label placement relative to the owning stroke's path.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativePosition {
    /// Fraction of total path length; below 0 or above 1 for labels beyond
    /// the start or end of the path
    pub percentage_along_line: f64,
    /// Signed distance in image pixels off the path
    pub perpendicular_distance: f64,
}

impl RelativePosition {
    pub fn new(percentage_along_line: f64, perpendicular_distance: f64) -> Self {
        Self {
            percentage_along_line,
            perpendicular_distance,
        }
    }

    /// The same placement seen in a mirror: a flip reverses the path's
    /// orientation, so the side changes sign.
    pub fn mirrored(&self) -> Self {
        Self::new(self.percentage_along_line, -self.perpendicular_distance)
    }

    pub fn is_finite(&self) -> bool {
        self.percentage_along_line.is_finite() && self.perpendicular_distance.is_finite()
    }
}

fn normal_of(tangent: Point) -> Point {
    Point::new(-tangent.y, tangent.x)
}

/// Finite stroke points with cumulative arc lengths.
///
/// The first and last segments extend past the path ends, so a label beyond
/// either end projects onto the extension with an arc length below zero or
/// above the total.
struct Polyline {
    points: Vec<Point>,
    total: f64,
}

/// Nearest point on a polyline.
struct Projection {
    arc: f64,
    foot: Point,
    tangent: Point,
}

impl Polyline {
    fn new(stroke: &Stroke) -> Self {
        let points: Vec<Point> = stroke.finite_points().collect();
        let total = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
        Self { points, total }
    }

    /// True when the path has no direction to measure against.
    fn is_degenerate(&self) -> bool {
        self.points.len() < 2 || self.total <= 0.0
    }

    fn segments(&self) -> Vec<(Point, Point, f64)> {
        self.points
            .windows(2)
            .map(|w| (w[0], w[1], w[0].distance_to(&w[1])))
            .filter(|(_, _, len)| *len > 0.0)
            .collect()
    }

    fn project(&self, p: Point) -> Option<Projection> {
        let segments = self.segments();
        let last = segments.len().checked_sub(1)?;
        let mut best: Option<(f64, Projection)> = None;
        let mut walked = 0.0;

        for (i, &(a, b, len)) in segments.iter().enumerate() {
            let ab = b - a;
            let lo = if i == 0 { f64::NEG_INFINITY } else { 0.0 };
            let hi = if i == last { f64::INFINITY } else { 1.0 };
            let t = ((p - a).dot(&ab) / (len * len)).min(hi).max(lo);
            let foot = a + ab.scale(t);
            let dist_sq = {
                let d = p - foot;
                d.dot(&d)
            };
            if best.as_ref().map_or(true, |(best_sq, _)| dist_sq < *best_sq) {
                best = Some((
                    dist_sq,
                    Projection {
                        arc: walked + t * len,
                        foot,
                        tangent: ab.scale(1.0 / len),
                    },
                ));
            }
            walked += len;
        }

        best.map(|(_, projection)| projection)
    }

    /// Point and tangent at arc length `arc` from the start. Arc lengths
    /// outside the path continue along the end tangents.
    fn walk(&self, arc: f64) -> Option<(Point, Point)> {
        let segments = self.segments();
        let &(start, second, first_len) = segments.first()?;
        if arc <= 0.0 {
            let tangent = (second - start).scale(1.0 / first_len);
            return Some((start + tangent.scale(arc), tangent));
        }

        let mut walked = 0.0;
        for &(a, b, len) in &segments {
            let tangent = (b - a).scale(1.0 / len);
            if walked + len >= arc {
                let t = ((arc - walked) / len).min(1.0).max(0.0);
                return Some((a + (b - a).scale(t), tangent));
            }
            walked += len;
        }

        let &(a, end, len) = segments.last()?;
        let tangent = (end - a).scale(1.0 / len);
        Some((end + tangent.scale(arc - walked), tangent))
    }
}

/// Offsets along the tangent shorter than this still decode exactly.
const TANGENT_RESIDUAL_EPSILON: f64 = 1e-6;

/// Expresses `anchor + offset` relative to the stroke's path.
///
/// Labels beyond either end of the path get a percentage below 0 or above 1
/// and the distance off the extended end segment, so they decode to the same
/// spot. A label in the outer wedge of a path corner has no exact encoding:
/// its distance to the corner is kept, the position along the path is not,
/// and the outcome carries [`GeometryWarning::ApproximateRelativePosition`].
///
/// Degenerate strokes fall back to percentage 0 at the first point with the
/// nominal tangent `(1, 0)`; the distance is then the offset's projection
/// onto the nominal normal.
pub fn encode_relative_position(
    stroke: &Stroke,
    anchor: Point,
    offset: PixelOffset,
) -> Outcome<RelativePosition> {
    let label = anchor + offset.as_vector();
    if !label.is_finite() {
        return Outcome::warned(
            RelativePosition::default(),
            GeometryWarning::InvalidPoint {
                x: label.x,
                y: label.y,
            },
        );
    }

    let line = Polyline::new(stroke);
    let Some(&start) = line.points.first() else {
        return Outcome::warned(
            RelativePosition::default(),
            GeometryWarning::DegenerateStroke { points: 0 },
        );
    };
    if line.is_degenerate() {
        let distance = (label - start).dot(&normal_of(NOMINAL_TANGENT));
        return Outcome::warned(
            RelativePosition::new(0.0, distance),
            GeometryWarning::DegenerateStroke {
                points: line.points.len(),
            },
        );
    }

    let Some(projection) = line.project(label) else {
        return Outcome::warned(
            RelativePosition::default(),
            GeometryWarning::DegenerateStroke {
                points: line.points.len(),
            },
        );
    };
    let d = label - projection.foot;
    let distance = if projection.tangent.cross(&d) < 0.0 {
        -d.length()
    } else {
        d.length()
    };
    let rel = RelativePosition::new(projection.arc / line.total, distance);

    let residual = d.dot(&projection.tangent).abs();
    if residual > TANGENT_RESIDUAL_EPSILON {
        return Outcome::warned(
            rel,
            GeometryWarning::ApproximateRelativePosition { residual },
        );
    }
    Outcome::clean(rel)
}

/// Rebuilds a pixel offset from the anchor using the stroke's current path.
pub fn decode_relative_position(
    stroke: &Stroke,
    anchor: Point,
    rel: &RelativePosition,
) -> Outcome<PixelOffset> {
    if !(rel.is_finite() && anchor.is_finite()) {
        return Outcome::warned(
            PixelOffset::default(),
            GeometryWarning::InvalidPoint {
                x: rel.percentage_along_line,
                y: rel.perpendicular_distance,
            },
        );
    }

    let line = Polyline::new(stroke);
    let Some(&start) = line.points.first() else {
        return Outcome::warned(
            PixelOffset::default(),
            GeometryWarning::DegenerateStroke { points: 0 },
        );
    };

    let walked = if line.is_degenerate() {
        None
    } else {
        line.walk(rel.percentage_along_line * line.total)
    };
    let Some((foot, tangent)) = walked else {
        let label = start + normal_of(NOMINAL_TANGENT).scale(rel.perpendicular_distance);
        return Outcome::warned(
            PixelOffset::from_vector(label - anchor),
            GeometryWarning::DegenerateStroke {
                points: line.points.len(),
            },
        );
    };

    let label = foot + normal_of(tangent).scale(rel.perpendicular_distance);
    Outcome::clean(PixelOffset::from_vector(label - anchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeKind;

    fn horizontal() -> Stroke {
        Stroke::straight(Point::new(100.0, 100.0), Point::new(300.0, 100.0))
    }

    #[test]
    fn test_encode_on_horizontal_line() {
        // Anchor (200, 100); label 20px below the 3/4 point
        let rel = encode_relative_position(
            &horizontal(),
            Point::new(200.0, 100.0),
            PixelOffset::new(50.0, 20.0),
        );
        assert!(rel.is_clean());
        assert_eq!(*rel.value(), RelativePosition::new(0.75, 20.0));
    }

    #[test]
    fn test_side_sign() {
        let anchor = Point::new(200.0, 100.0);
        let above = encode_relative_position(&horizontal(), anchor, PixelOffset::new(0.0, -15.0))
            .into_value();
        assert_eq!(above.perpendicular_distance, -15.0);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let stroke = Stroke::new(
            StrokeKind::Freehand,
            vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
            ],
        );
        let anchor = Point::new(50.0, 50.0);
        let offset = PixelOffset::new(60.0, 20.0);
        let rel = encode_relative_position(&stroke, anchor, offset).into_value();
        let back = decode_relative_position(&stroke, anchor, &rel).into_value();
        assert!((back.dx - offset.dx).abs() < 1e-9);
        assert!((back.dy - offset.dy).abs() < 1e-9);
    }

    #[test]
    fn test_label_past_end_on_axis() {
        let anchor = Point::new(200.0, 100.0);
        let rel = encode_relative_position(&horizontal(), anchor, PixelOffset::new(200.0, 0.0));
        assert!(rel.is_clean());
        assert_eq!(*rel.value(), RelativePosition::new(1.5, 0.0));

        let back = decode_relative_position(&horizontal(), anchor, rel.value()).into_value();
        assert_eq!(back, PixelOffset::new(200.0, 0.0));
    }

    #[test]
    fn test_label_before_start() {
        // Label (70, 70): 30px before the start, 30px on the negative side
        let anchor = Point::new(200.0, 100.0);
        let offset = PixelOffset::new(-130.0, -30.0);
        let rel = encode_relative_position(&horizontal(), anchor, offset);
        assert!(rel.is_clean());
        assert!((rel.value().percentage_along_line + 0.15).abs() < 1e-12);
        assert!((rel.value().perpendicular_distance + 30.0).abs() < 1e-12);

        let back = decode_relative_position(&horizontal(), anchor, rel.value()).into_value();
        assert!((back.dx - offset.dx).abs() < 1e-9);
        assert!((back.dy - offset.dy).abs() < 1e-9);
    }

    #[test]
    fn test_label_on_path() {
        let anchor = Point::new(200.0, 100.0);
        let rel = encode_relative_position(&horizontal(), anchor, PixelOffset::new(20.0, 0.0));
        assert_eq!(rel.into_value(), RelativePosition::new(0.6, 0.0));
    }

    #[test]
    fn test_outer_corner_is_approximate() {
        let stroke = Stroke::new(
            StrokeKind::Freehand,
            vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
            ],
        );
        // Label (110, -10) lies beyond the corner at (100, 0)
        let anchor = Point::new(50.0, 50.0);
        let rel = encode_relative_position(&stroke, anchor, PixelOffset::new(60.0, -60.0));
        assert_eq!(
            rel.warning(),
            Some(&GeometryWarning::ApproximateRelativePosition { residual: 10.0 })
        );
        let rel = rel.into_value();
        assert_eq!(rel.percentage_along_line, 0.5);
        assert!((rel.perpendicular_distance + 200f64.sqrt()).abs() < 1e-12);

        // Same distance from the corner, same side of the path
        let back = decode_relative_position(&stroke, anchor, &rel).into_value();
        let label = anchor + back.as_vector();
        assert!((label.distance_to(&Point::new(100.0, 0.0)) - 200f64.sqrt()).abs() < 1e-9);
        assert!(label.y < 0.0);
    }

    #[test]
    fn test_decode_follows_rotated_geometry() {
        let rel = RelativePosition::new(0.5, 10.0);
        // Vertical stroke pointing down: tangent (0, 1), normal (-1, 0)
        let vertical = Stroke::straight(Point::new(0.0, 0.0), Point::new(0.0, 100.0));
        let offset =
            decode_relative_position(&vertical, Point::new(0.0, 50.0), &rel).into_value();
        assert_eq!(offset, PixelOffset::new(-10.0, 0.0));
    }

    #[test]
    fn test_empty_stroke_fails_soft() {
        let empty = Stroke::new(StrokeKind::Freehand, vec![]);
        let rel = encode_relative_position(&empty, Point::ORIGIN, PixelOffset::new(1.0, 1.0));
        assert_eq!(*rel.value(), RelativePosition::default());
        assert!(!rel.is_clean());

        let off = decode_relative_position(&empty, Point::ORIGIN, &RelativePosition::new(0.5, 3.0));
        assert_eq!(*off.value(), PixelOffset::default());
    }

    #[test]
    fn test_single_point_uses_nominal_tangent() {
        let dot = Stroke::new(StrokeKind::Freehand, vec![Point::new(10.0, 10.0)]);
        let anchor = Point::new(10.0, 10.0);
        let rel = encode_relative_position(&dot, anchor, PixelOffset::new(4.0, 7.0));
        assert_eq!(*rel.value(), RelativePosition::new(0.0, 7.0));
        assert_eq!(
            rel.warning(),
            Some(&GeometryWarning::DegenerateStroke { points: 1 })
        );

        let off = decode_relative_position(&dot, anchor, rel.value()).into_value();
        assert_eq!(off, PixelOffset::new(0.0, 7.0));
    }

    #[test]
    fn test_zero_length_path_is_degenerate() {
        let p = Point::new(5.0, 5.0);
        let stroke = Stroke::new(StrokeKind::Freehand, vec![p, p, p]);
        let rel = encode_relative_position(&stroke, p, PixelOffset::new(0.0, -2.0));
        assert_eq!(*rel.value(), RelativePosition::new(0.0, -2.0));
        assert!(!rel.is_clean());
    }

    #[test]
    fn test_mirrored_negates_distance() {
        let rel = RelativePosition::new(0.3, 12.0);
        assert_eq!(rel.mirrored(), RelativePosition::new(0.3, -12.0));
    }

    #[test]
    fn test_serde_camel_case() {
        let json = serde_json::to_string(&RelativePosition::new(0.5, -3.0)).unwrap();
        assert_eq!(json, r#"{"percentageAlongLine":0.5,"perpendicularDistance":-3.0}"#);
    }
}
