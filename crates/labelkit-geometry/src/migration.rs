//! One-time upgrade of legacy pixel offsets to the normalized schema.
//!
//! Runs once when a document is loaded, before any placement query relies
//! on offsets being uniformly normalized. Re-running it is a no-op.

use std::fmt;

use labelkit_core::{GeometryWarning, Outcome, Size};
use serde::Serialize;

use crate::context::GeometryContext;
use crate::normalize::PixelOffset;
use crate::offset::{NormOffset, Offset};
use crate::store::AnnotationStore;

/// Converts a legacy offset against the default 800×600 reference when
/// `natural` is unknown.
pub fn migrate_pixel_offset_to_norm(offset: &Offset, natural: Option<Size>) -> Outcome<Offset> {
    migrate_with_fallback(offset, natural, Size::default_reference())
}

/// Converts a legacy offset to a normalized one against `natural`.
///
/// A missing or zero natural size falls back to `fallback` with a warning;
/// the result is still a valid normalized offset. Normalized input is
/// returned unchanged.
pub fn migrate_with_fallback(
    offset: &Offset,
    natural: Option<Size>,
    fallback: Size,
) -> Outcome<Offset> {
    let Offset::Legacy { x, y } = *offset else {
        return Outcome::clean(*offset);
    };
    let pixels = PixelOffset::new(x, y);

    match natural.filter(Size::is_usable) {
        Some(reference) => NormOffset::from_pixels(pixels, reference).map(Offset::Normalized),
        None => {
            let missing = natural.unwrap_or(Size::new(0.0, 0.0));
            let warning = GeometryWarning::InvalidReference {
                w: missing.w,
                h: missing.h,
            };
            let (value, _) = NormOffset::from_pixels(pixels, fallback)
                .map(Offset::Normalized)
                .into_parts();
            Outcome::warned(value, warning)
        }
    }
}

/// Summary of a migration run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MigrationReport {
    pub images_scanned: usize,
    pub offsets_migrated: usize,
    pub already_normalized: usize,
    /// Images left untouched because their natural size is unknown
    pub skipped_images: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.offsets_migrated == 0
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} image(s) scanned, {} offset(s) migrated, {} already normalized, \
             {} image(s) skipped",
            self.images_scanned,
            self.offsets_migrated,
            self.already_normalized,
            self.skipped_images.len()
        )
    }
}

/// Normalizes every legacy offset in the store.
///
/// Images that hold legacy offsets but have no known natural dimensions are
/// skipped and listed in the report. Marks the context's migration as complete.
pub fn run_offset_migration(
    ctx: &mut GeometryContext,
    store: &mut AnnotationStore,
) -> MigrationReport {
    let mut report = MigrationReport::default();

    for (label, record) in store.images.iter_mut() {
        report.images_scanned += 1;

        let natural = match record.usable_natural() {
            Some(natural) => natural,
            None if record.has_legacy_offsets() => {
                tracing::warn!(
                    target: "labelkit::geometry",
                    "{}",
                    GeometryWarning::MissingDimensions {
                        image: label.clone()
                    }
                );
                report.skipped_images.push(label.clone());
                continue;
            }
            None => {
                // Nothing legacy to migrate
                report.already_normalized += record.label_offsets.len();
                continue;
            }
        };

        let mut migrated = 0;
        for offset in record.label_offsets.values_mut() {
            if offset.is_normalized() {
                report.already_normalized += 1;
                continue;
            }
            *offset = migrate_with_fallback(offset, Some(natural), natural).into_value();
            migrated += 1;
        }
        if migrated > 0 {
            tracing::debug!("Migrated {} offset(s) on {} against {}", migrated, label, natural);
        }
        report.offsets_migrated += migrated;
    }

    ctx.mark_migration_complete();
    tracing::info!("Offset migration complete: {}", report);
    report
}

pub fn is_migration_complete(ctx: &GeometryContext) -> bool {
    ctx.is_migration_complete()
}
