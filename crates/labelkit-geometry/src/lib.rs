//! # LabelKit Geometry
//!
//! Keeps measurement labels visually attached to their strokes while the
//! view is panned and zoomed and while the underlying image is rotated or
//! flipped.
//!
//! ## Core Components
//!
//! - **Transform State**: owns the live view transform and tracks whether it
//!   has settled ([`TransformState`])
//! - **Space Converter**: image ↔ canvas point conversion ([`to_canvas`],
//!   [`to_image`])
//! - **Normalization Codec**: pixel ↔ fractional offsets
//! - **Migration Runner**: one-time upgrade of legacy pixel offsets
//! - **Anchor Cache**: versioned stroke bounding-box centers
//! - **Relative Position Codec**: offsets expressed along the stroke's path
//! - **Content Transform Engine**: rotate/flip of strokes and every offset
//!   representation
//!
//! ## Architecture
//!
//! ```text
//! GeometryContext
//!   ├── TransformState (view transform, session, listeners)
//!   ├── AnchorCache (per-image version counters)
//!   └── Config
//!
//! AnnotationStore (host-owned)
//!   └── ImageRecord
//!         ├── strokes
//!         ├── label_offsets / absolute_positions / relative_positions
//!         └── rotation, rotation_pivot, offset_rotation_stamps
//! ```
//!
//! Render-path functions return an [`Outcome`](labelkit_core::Outcome) and
//! never panic on malformed geometry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use labelkit_geometry::{GeometryContext, AnnotationStore, run_offset_migration};
//!
//! let mut ctx = GeometryContext::default();
//! let mut store = AnnotationStore::load(path)?;
//! run_offset_migration(&mut ctx, &mut store);
//! let canvas = resolve_label_position(&mut ctx, &store, "front", "A1")?;
//! ```

pub mod anchor;
pub mod content;
pub mod context;
pub mod convert;
pub mod migration;
pub mod normalize;
pub mod offset;
pub mod placement;
pub mod relative;
pub mod store;
pub mod stroke;
pub mod transform;

pub use anchor::{compute_anchor_center_image, AnchorCache, AnchorCacheEntry};
pub use content::{
    apply_content_transform, drawing_centroid, flip_coordinates, flip_offset_vector,
    normalize_angle, rotate_coordinates, rotate_offset_vector, ContentTransform,
    ContentTransformReport, FlipDirection,
};
pub use context::GeometryContext;
pub use convert::{compute_scale_for_fit, to_canvas, to_image, FitMode};
pub use migration::{
    is_migration_complete, migrate_pixel_offset_to_norm, migrate_with_fallback,
    run_offset_migration, MigrationReport,
};
pub use normalize::{norm_to_pixel_offset, pixel_offset_to_norm, NormalizedOffset, PixelOffset};
pub use offset::{is_legacy_offset, is_legacy_record, validate_offset_format, NormOffset, Offset};
pub use placement::{
    can_persist_offsets, capture_label_drag, place_label, resolve_label_position, DragOutcome,
};
pub use relative::{decode_relative_position, encode_relative_position, RelativePosition};
pub use store::{AnnotationStore, ImageRecord};
pub use stroke::{ArrowSettings, Stroke, StrokeKind};
pub use transform::{
    FitRecord, RoundTripGuard, SessionPhase, TransformHash, TransformPatch, TransformSession,
    TransformState,
};
