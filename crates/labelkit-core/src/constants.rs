//! Shared numeric constants.
//!
//! These are the built-in defaults; `labelkit-settings` can override the ones
//! that are user-tunable.

/// Smallest accepted view scale (CSS pixels per image pixel).
pub const MIN_SCALE: f64 = 0.01;

/// Largest accepted view scale.
pub const MAX_SCALE: f64 = 100.0;

/// Consecutive unchanged transform hashes required before a session is Stable.
pub const STABLE_TICKS_REQUIRED: u32 = 2;

/// Maximum round-trip error, in CSS pixels, tolerated by the persistence guard.
pub const ROUNDTRIP_TOLERANCE_CSS: f64 = 0.25;

/// Image-space probe used by the persistence guard round-trip check.
pub const ROUNDTRIP_PROBE: (f64, f64) = (100.0, 100.0);

/// Reference used when an image's natural size is unknown during migration.
pub const DEFAULT_REFERENCE_WIDTH: f64 = 800.0;
/// See [`DEFAULT_REFERENCE_WIDTH`].
pub const DEFAULT_REFERENCE_HEIGHT: f64 = 600.0;

/// Schema version carried by every normalized offset.
pub const NORMALIZED_OFFSET_VERSION: u8 = 2;

/// Multiplicative step used by zoom-in/zoom-out helpers.
pub const ZOOM_STEP: f64 = 1.2;
