//! # LabelKit
//!
//! Coordinate and anchoring core for measurement labels drawn over product
//! photographs. Labels stay attached to their strokes while the view is
//! panned and zoomed and while image content is rotated or flipped.
//!
//! ## Architecture
//!
//! LabelKit is organized as a workspace with multiple crates:
//!
//! 1. **labelkit-core** - Points, sizes, the view transform, soft-failure
//!    outcomes, errors
//! 2. **labelkit-settings** - Configuration loading, saving and validation
//! 3. **labelkit-geometry** - Transform state, conversion, offset codecs,
//!    anchor cache, content transforms, migration
//! 4. **labelkit** - This crate: re-exports, logging setup, and the
//!    `labelkit` command-line tool

pub mod cli;

pub use labelkit_geometry as geometry;
pub use labelkit_settings as settings;

pub use labelkit_core::{
    Error, GeometryWarning, ListenerHandle, Outcome, Point, RedrawListener, Result, Size,
    Transform,
};

pub use labelkit_geometry::{
    apply_content_transform, can_persist_offsets, capture_label_drag, compute_scale_for_fit,
    is_migration_complete, place_label, resolve_label_position, run_offset_migration,
    to_canvas, to_image, AnchorCache, AnnotationStore, ContentTransform, FitMode,
    FlipDirection, GeometryContext, ImageRecord, MigrationReport, NormalizedOffset, Offset,
    PixelOffset, RelativePosition, SessionPhase, Stroke, TransformPatch, TransformState,
};

pub use labelkit_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr so command results on stdout stay machine-readable
/// - RUST_LOG environment variable support
/// - INFO as the default level
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
