use labelkit_core::Point;
use serde::{Deserialize, Serialize};

/// How a stroke was drawn. Only affects rendering; geometry always works on
/// the point list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeKind {
    #[default]
    Freehand,
    Straight,
    Curved,
    Arrow,
    CurvedArrow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowSettings {
    pub start_arrow: bool,
    pub end_arrow: bool,
    pub arrow_size: f64,
}

impl Default for ArrowSettings {
    fn default() -> Self {
        Self {
            start_arrow: false,
            end_arrow: true,
            arrow_size: 15.0,
        }
    }
}

/// A measurement stroke. `points` are image-space and are the only source of
/// truth for the stroke's geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub points: Vec<Point>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(rename = "type", default)]
    pub kind: StrokeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrow_settings: Option<ArrowSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_pattern: Option<[f64; 2]>,
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_width() -> f64 {
    5.0
}

impl Stroke {
    pub fn new(kind: StrokeKind, points: Vec<Point>) -> Self {
        Self {
            points,
            color: default_color(),
            width: default_width(),
            kind,
            arrow_settings: None,
            dash_pattern: None,
        }
    }

    /// Two-point straight stroke.
    pub fn straight(from: Point, to: Point) -> Self {
        Self::new(StrokeKind::Straight, vec![from, to])
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_arrows(mut self, settings: ArrowSettings) -> Self {
        self.arrow_settings = Some(settings);
        self
    }

    /// Points with finite coordinates; malformed points are skipped by every
    /// geometric query.
    pub fn finite_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.iter().copied().filter(Point::is_finite)
    }

    /// Axis-aligned bounds of the finite points as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        self.finite_points().fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((min, max)) => Some((
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )),
        })
    }
}
