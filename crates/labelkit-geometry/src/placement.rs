//! Label placement on the redraw path and offset capture on drag.
//!
//! Offsets are only written while the view transform is settled and
//! round-trips within tolerance. A drag that ends while the view is still
//! moving is dropped rather than queued.

use labelkit_core::{Error, GeometryWarning, Outcome, Point, Result, Size, Transform};

use crate::context::GeometryContext;
use crate::convert::{to_canvas, to_image};
use crate::migration::migrate_with_fallback;
use crate::normalize::{norm_to_pixel_offset, NormalizedOffset, PixelOffset};
use crate::offset::Offset;
use crate::relative::{decode_relative_position, encode_relative_position, RelativePosition};
use crate::store::{AnnotationStore, ImageRecord};
use crate::stroke::Stroke;
use crate::transform::{RoundTripGuard, SessionPhase, TransformSession};

/// Canvas position of a label: de-normalize the offset, add it to the
/// anchor, convert to device pixels.
pub fn place_label(
    label_id: &str,
    anchor_center_image: Point,
    offset_norm: NormalizedOffset,
    norm_ref: impl Into<Option<Size>>,
    t: &Transform,
) -> Outcome<Point> {
    let placed = norm_to_pixel_offset(offset_norm.dx_norm, offset_norm.dy_norm, norm_ref)
        .and_then(|px| to_canvas(anchor_center_image + px.as_vector(), t));
    tracing::trace!("Placed label {} at {}", label_id, placed.value());
    placed
}

/// Gate checked before any offset write.
pub fn can_persist_offsets(session: &TransformSession, guard: &RoundTripGuard) -> bool {
    session.phase == SessionPhase::Stable && session.committed.is_some_and(|t| guard.passes(&t))
}

fn stroke_of<'a>(record: &'a ImageRecord, image: &str, stroke: &str) -> Result<&'a Stroke> {
    record.stroke(stroke).ok_or_else(|| Error::UnknownStroke {
        image: image.to_string(),
        stroke: stroke.to_string(),
    })
}

/// Image-space offset of a label from its anchor, using whichever record
/// is authoritative: the stored offset, else the relative position, else
/// none.
fn label_offset(
    record: &ImageRecord,
    label: &str,
    stroke: &Stroke,
    anchor: Point,
) -> Outcome<PixelOffset> {
    if let Some(offset) = record.label_offsets.get(label) {
        return offset.to_pixels();
    }
    if let Some(rel) = record.relative_positions.get(label) {
        return decode_relative_position(stroke, anchor, rel);
    }
    Outcome::clean(PixelOffset::default())
}

/// Canvas position of the label attached to `stroke` on the redraw path.
pub fn resolve_label_position(
    ctx: &mut GeometryContext,
    store: &AnnotationStore,
    image: &str,
    stroke: &str,
) -> Result<Outcome<Point>> {
    let record = store.image(image)?;
    let data = stroke_of(record, image, stroke)?;
    let t = ctx.transform().get();

    let position = ctx
        .anchors_mut()
        .get_cached_anchor_center(stroke, image, data)
        .and_then(|anchor| {
            label_offset(record, stroke, data, anchor).map(|px| anchor + px.as_vector())
        })
        .and_then(|p| to_canvas(p, &t));
    Ok(position)
}

/// Result of a label drag.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// The new offset was written
    Persisted {
        offset: Offset,
        relative: RelativePosition,
    },
    /// The view was not settled; nothing was written
    Withheld { phase: SessionPhase },
}

/// Stores the label of `stroke` at the dropped canvas point.
///
/// Writes a normalized offset from the cached anchor, the matching relative
/// position and absolute position, and resets the stroke's rotation stamp.
pub fn capture_label_drag(
    ctx: &mut GeometryContext,
    store: &mut AnnotationStore,
    image: &str,
    stroke: &str,
    canvas_point: Point,
) -> Result<Outcome<DragOutcome>> {
    let session = ctx.transform().session();
    if !can_persist_offsets(&session, ctx.guard()) {
        tracing::debug!(
            "Label drag on {}/{} withheld while session is {}",
            image,
            stroke,
            session.phase
        );
        return Ok(Outcome::clean(DragOutcome::Withheld {
            phase: session.phase,
        }));
    }

    let fallback = ctx.config().migration.default_reference;
    let t = ctx.transform().get();
    let record = store.image_mut(image)?;
    let data = stroke_of(record, image, stroke)?;

    let mut warnings: Vec<GeometryWarning> = Vec::new();
    let dropped = to_image(canvas_point, &t).collect_into(&mut warnings);
    let anchor = ctx
        .anchors_mut()
        .get_cached_anchor_center(stroke, image, data)
        .collect_into(&mut warnings);
    let px = PixelOffset::from_vector(dropped - anchor);
    let relative = encode_relative_position(data, anchor, px).collect_into(&mut warnings);
    let legacy = Offset::legacy(px.dx, px.dy);
    let offset = migrate_with_fallback(&legacy, record.usable_natural(), fallback)
        .collect_into(&mut warnings);

    record.label_offsets.insert(stroke.to_string(), offset);
    record.relative_positions.insert(stroke.to_string(), relative);
    record.absolute_positions.insert(stroke.to_string(), dropped);
    record.offset_rotation_stamps.insert(stroke.to_string(), 0.0);
    tracing::debug!("Label {}/{} moved to {}", image, stroke, dropped);

    Ok(Outcome::from_parts(
        DragOutcome::Persisted { offset, relative },
        warnings.into_iter().next(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformPatch;

    fn settle(ctx: &mut GeometryContext, patch: TransformPatch) {
        for _ in 0..3 {
            let _ = ctx.transform_mut().set(patch);
        }
    }

    fn store() -> AnnotationStore {
        let mut record = ImageRecord::with_natural(Size::new(800.0, 400.0));
        record.strokes.insert(
            "A1".to_string(),
            Stroke::straight(Point::new(100.0, 100.0), Point::new(300.0, 100.0)),
        );
        let mut store = AnnotationStore::new();
        store.insert_image("front", record);
        store
    }

    #[test]
    fn test_place_label() {
        let t = Transform::new(2.0, 10.0, 10.0, 1.0);
        let p = place_label(
            "A1",
            Point::new(200.0, 100.0),
            NormalizedOffset::new(0.05, -0.05),
            Size::new(800.0, 400.0),
            &t,
        );
        // (200 + 40, 100 - 20) * 2 + 10
        assert_eq!(p.into_value(), Point::new(490.0, 170.0));
    }

    #[test]
    fn test_place_label_without_reference_sits_on_anchor() {
        let t = Transform::default();
        let p = place_label("A1", Point::new(5.0, 5.0), NormalizedOffset::new(0.5, 0.5), None, &t);
        assert_eq!(*p.value(), Point::new(5.0, 5.0));
        assert!(!p.is_clean());
    }

    #[test]
    fn test_can_persist_requires_stable() {
        let mut ctx = GeometryContext::default();
        let _ = ctx.transform_mut().set(TransformPatch::new().scale(2.0));
        assert!(!can_persist_offsets(&ctx.transform().session(), ctx.guard()));
        settle(&mut ctx, TransformPatch::new().scale(2.0));
        assert!(can_persist_offsets(&ctx.transform().session(), ctx.guard()));
    }

    #[test]
    fn test_drag_is_withheld_while_mutating() {
        let mut ctx = GeometryContext::default();
        let mut store = store();
        let _ = ctx.transform_mut().set(TransformPatch::new().scale(2.0));

        let out = capture_label_drag(&mut ctx, &mut store, "front", "A1", Point::new(0.0, 0.0))
            .unwrap()
            .into_value();
        assert_eq!(
            out,
            DragOutcome::Withheld {
                phase: SessionPhase::Mutating
            }
        );
        assert!(store.image("front").unwrap().label_offsets.is_empty());
    }

    #[test]
    fn test_drag_then_resolve() {
        let mut ctx = GeometryContext::default();
        let mut store = store();
        settle(&mut ctx, TransformPatch::new().scale(2.0).pan(10.0, 10.0));

        // Canvas (490, 170) is image (240, 80): 40 right of and 20 above the anchor
        let out =
            capture_label_drag(&mut ctx, &mut store, "front", "A1", Point::new(490.0, 170.0))
                .unwrap();
        assert!(out.is_clean());
        let DragOutcome::Persisted { offset, relative } = out.into_value() else {
            panic!("drag should persist once the session is stable");
        };
        assert_eq!(offset, Offset::normalized(0.05, -0.05, Size::new(800.0, 400.0)));
        assert_eq!(relative, RelativePosition::new(0.7, -20.0));

        let placed = resolve_label_position(&mut ctx, &store, "front", "A1")
            .unwrap()
            .into_value();
        assert_eq!(placed, Point::new(490.0, 170.0));
    }

    #[test]
    fn test_drag_past_stroke_end() {
        let mut ctx = GeometryContext::default();
        let mut store = store();
        settle(&mut ctx, TransformPatch::new().scale(1.0));

        // Image (400, 100) is 100px beyond the end of A1, on its axis
        let out = capture_label_drag(&mut ctx, &mut store, "front", "A1", Point::new(400.0, 100.0))
            .unwrap()
            .into_value();
        let DragOutcome::Persisted { relative, .. } = out else {
            panic!("drag should persist once the session is stable");
        };
        assert_eq!(relative, RelativePosition::new(1.5, 0.0));
    }

    #[test]
    fn test_resolve_unknown_stroke() {
        let mut ctx = GeometryContext::default();
        let err = resolve_label_position(&mut ctx, &store(), "front", "Z9").unwrap_err();
        assert!(err.is_lookup_error());
    }

    #[test]
    fn test_resolve_without_offset_uses_anchor() {
        let mut ctx = GeometryContext::default();
        let placed = resolve_label_position(&mut ctx, &store(), "front", "A1")
            .unwrap()
            .into_value();
        assert_eq!(placed, Point::new(200.0, 100.0));
    }
}
