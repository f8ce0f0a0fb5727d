//! Stroke anchor centers and their per-image cache.
//!
//! Every label is positioned relative to the bounding-box center of its
//! stroke. Redraws ask for that center on every frame, so it is memoized per
//! (image, stroke) and stamped with the image's version counter. Bumping the
//! counter invalidates every entry for the image at once.

use std::collections::HashMap;

use labelkit_core::{GeometryWarning, Outcome, Point};

use crate::stroke::Stroke;

/// Axis-aligned bounding-box center of the stroke's finite points.
///
/// A stroke without any usable point yields the origin with a warning.
pub fn compute_anchor_center_image(stroke: &Stroke) -> Outcome<Point> {
    match stroke.bounds() {
        Some((min, max)) => Outcome::clean(Point::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
        )),
        None => Outcome::warned(
            Point::ORIGIN,
            GeometryWarning::DegenerateStroke { points: 0 },
        ),
    }
}

/// A memoized anchor center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorCacheEntry {
    pub x: f64,
    pub y: f64,
    /// Image version the entry was computed at
    pub version: u64,
}

impl AnchorCacheEntry {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Default)]
struct ImageAnchors {
    version: u64,
    entries: HashMap<String, AnchorCacheEntry>,
}

/// Versioned anchor cache keyed by image label, then stroke label.
#[derive(Debug, Default)]
pub struct AnchorCache {
    images: HashMap<String, ImageAnchors>,
}

impl AnchorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version counter of an image. Starts at 0.
    pub fn version(&self, image_label: &str) -> u64 {
        self.images.get(image_label).map_or(0, |img| img.version)
    }

    /// Returns the anchor center for a stroke, recomputing it when the cached
    /// entry is missing or stale.
    pub fn get_cached_anchor_center(
        &mut self,
        stroke_label: &str,
        image_label: &str,
        stroke: &Stroke,
    ) -> Outcome<Point> {
        let anchors = self.images.entry(image_label.to_string()).or_default();
        if let Some(entry) = anchors.entries.get(stroke_label) {
            if entry.version == anchors.version {
                return Outcome::clean(entry.point());
            }
        }

        let center = compute_anchor_center_image(stroke);
        if center.is_clean() {
            let point = *center.value();
            tracing::debug!(
                "Anchor for {}/{} recomputed at {} (v{})",
                image_label,
                stroke_label,
                point,
                anchors.version
            );
            anchors.entries.insert(
                stroke_label.to_string(),
                AnchorCacheEntry {
                    x: point.x,
                    y: point.y,
                    version: anchors.version,
                },
            );
        } else {
            anchors.entries.remove(stroke_label);
        }
        center
    }

    /// The cached entry for a stroke, if present and still valid.
    pub fn peek(&self, image_label: &str, stroke_label: &str) -> Option<&AnchorCacheEntry> {
        let anchors = self.images.get(image_label)?;
        anchors
            .entries
            .get(stroke_label)
            .filter(|entry| entry.version == anchors.version)
    }

    pub fn is_cached(&self, image_label: &str, stroke_label: &str) -> bool {
        self.peek(image_label, stroke_label).is_some()
    }

    /// Drops every entry for the image and advances its version counter.
    pub fn invalidate_anchor_cache(&mut self, image_label: &str) {
        let anchors = self.images.entry(image_label.to_string()).or_default();
        anchors.entries.clear();
        anchors.version += 1;
        tracing::debug!(
            "Anchor cache for {} invalidated (v{})",
            image_label,
            anchors.version
        );
    }

    /// Number of valid entries across all images.
    pub fn len(&self) -> usize {
        self.images
            .values()
            .map(|img| {
                img.entries
                    .values()
                    .filter(|entry| entry.version == img.version)
                    .count()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeKind;

    fn line() -> Stroke {
        Stroke::straight(Point::new(100.0, 100.0), Point::new(300.0, 100.0))
    }

    #[test]
    fn test_anchor_is_bbox_center() {
        let stroke = Stroke::new(
            StrokeKind::Freehand,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 40.0),
                Point::new(20.0, 10.0),
            ],
        );
        assert_eq!(
            compute_anchor_center_image(&stroke).into_value(),
            Point::new(10.0, 20.0)
        );
    }

    #[test]
    fn test_empty_stroke_anchor_is_origin() {
        let stroke = Stroke::new(StrokeKind::Freehand, vec![]);
        let anchor = compute_anchor_center_image(&stroke);
        assert_eq!(*anchor.value(), Point::ORIGIN);
        assert!(!anchor.is_clean());
    }

    #[test]
    fn test_cache_hit_returns_stored_value() {
        let mut cache = AnchorCache::new();
        let first = cache.get_cached_anchor_center("A1", "front", &line()).into_value();
        assert_eq!(first, Point::new(200.0, 100.0));
        assert!(cache.is_cached("front", "A1"));

        // A moved stroke is not noticed until the image is invalidated
        let moved = Stroke::straight(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let second = cache.get_cached_anchor_center("A1", "front", &moved).into_value();
        assert_eq!(second, first);

        cache.invalidate_anchor_cache("front");
        assert!(!cache.is_cached("front", "A1"));
        let third = cache.get_cached_anchor_center("A1", "front", &moved).into_value();
        assert_eq!(third, Point::new(5.0, 0.0));
    }

    #[test]
    fn test_invalidate_bumps_version_per_image() {
        let mut cache = AnchorCache::new();
        cache.get_cached_anchor_center("A1", "front", &line());
        cache.get_cached_anchor_center("A1", "side", &line());
        assert_eq!(cache.len(), 2);

        cache.invalidate_anchor_cache("front");
        cache.invalidate_anchor_cache("front");
        assert_eq!(cache.version("front"), 2);
        assert_eq!(cache.version("side"), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_degenerate_strokes_are_not_cached() {
        let mut cache = AnchorCache::new();
        let empty = Stroke::new(StrokeKind::Freehand, vec![]);
        let anchor = cache.get_cached_anchor_center("A1", "front", &empty);
        assert!(!anchor.is_clean());
        assert!(!cache.is_cached("front", "A1"));
        assert!(cache.is_empty());
    }
}
