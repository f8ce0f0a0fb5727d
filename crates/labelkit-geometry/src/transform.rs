//! Live view transform and session stability tracking.
//!
//! [`TransformState`] is the single owner of the image → canvas transform.
//! Every `set` recomputes a coarse stability hash; once the hash has stayed
//! unchanged for enough consecutive updates the session is considered
//! settled and label offsets may be written again.

use std::fmt;

use labelkit_core::constants::ZOOM_STEP;
use labelkit_core::{
    GeometryWarning, ListenerHandle, Outcome, Point, RedrawListener, Size, Transform,
};
use labelkit_settings::{PlacementSettings, TransformSettings};
use serde::{Deserialize, Serialize};

use crate::convert::{compute_scale_for_fit, to_canvas, to_image, FitMode};

/// A partial transform update. Unset fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformPatch {
    pub scale: Option<f64>,
    pub pan_x: Option<f64>,
    pub pan_y: Option<f64>,
    pub dpr: Option<f64>,
}

impl TransformPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn pan(mut self, pan_x: f64, pan_y: f64) -> Self {
        self.pan_x = Some(pan_x);
        self.pan_y = Some(pan_y);
        self
    }

    pub fn dpr(mut self, dpr: f64) -> Self {
        self.dpr = Some(dpr);
        self
    }

    fn is_empty(&self) -> bool {
        self.scale.is_none() && self.pan_x.is_none() && self.pan_y.is_none() && self.dpr.is_none()
    }
}

impl From<Transform> for TransformPatch {
    fn from(t: Transform) -> Self {
        Self::new().scale(t.scale).pan(t.pan_x, t.pan_y).dpr(t.dpr)
    }
}

/// Where the session is in its settle cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Transform has settled and round-trips within tolerance
    Stable,
    /// Transform changed recently
    Mutating,
    /// Transform settled but fails the round-trip check
    Desynced,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Mutating => write!(f, "mutating"),
            Self::Desynced => write!(f, "desynced"),
        }
    }
}

/// Coarse transform fingerprint: scale to 1e-6, pan to whole CSS pixels,
/// dpr to 1e-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformHash {
    scale: i64,
    pan_x: i64,
    pan_y: i64,
    dpr: i64,
}

impl From<&Transform> for TransformHash {
    fn from(t: &Transform) -> Self {
        Self {
            scale: (t.scale * 1e6).round() as i64,
            pan_x: t.pan_x.round() as i64,
            pan_y: t.pan_y.round() as i64,
            dpr: (t.dpr * 1e3).round() as i64,
        }
    }
}

/// The last fit-to-viewport request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRecord {
    pub natural: Size,
    pub viewport_css: Size,
    pub mode: FitMode,
    pub scale: f64,
}

/// Read-only session snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSession {
    pub phase: SessionPhase,
    pub stable_ticks: u32,
    pub last_hash: Option<TransformHash>,
    /// Phase is Stable
    pub can_persist: bool,
    /// Transform snapshotted when the session last became Stable
    pub committed: Option<Transform>,
    pub fit: Option<FitRecord>,
}

/// Round-trip check run before offsets may be persisted.
///
/// The probe point is sent to the canvas and back; the error is measured
/// in CSS pixels. Device-pixel rounding alone can exceed a tight tolerance
/// at fractional scales, which keeps such transforms out of Stable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTripGuard {
    pub probe: Point,
    pub tolerance_css: f64,
}

impl Default for RoundTripGuard {
    fn default() -> Self {
        Self::from_settings(&PlacementSettings::default())
    }
}

impl RoundTripGuard {
    pub fn new(probe: Point, tolerance_css: f64) -> Self {
        Self {
            probe,
            tolerance_css,
        }
    }

    pub fn from_settings(settings: &PlacementSettings) -> Self {
        Self::new(settings.roundtrip_probe, settings.roundtrip_tolerance_css)
    }

    /// Round-trip error of the probe in CSS pixels; infinite when the
    /// transform cannot map points at all.
    pub fn round_trip_error(&self, t: &Transform) -> f64 {
        let canvas = to_canvas(self.probe, t);
        if !canvas.is_clean() {
            return f64::INFINITY;
        }
        let back = to_image(canvas.into_value(), t);
        if !back.is_clean() {
            return f64::INFINITY;
        }
        back.value().distance_to(&self.probe) * t.scale
    }

    pub fn passes(&self, t: &Transform) -> bool {
        self.round_trip_error(t) <= self.tolerance_css
    }
}

/// Owner of the live view transform.
pub struct TransformState {
    current: Transform,
    min_scale: f64,
    max_scale: f64,
    stable_ticks_required: u32,
    guard: RoundTripGuard,
    phase: SessionPhase,
    stable_ticks: u32,
    last_hash: Option<TransformHash>,
    committed: Option<Transform>,
    fit: Option<FitRecord>,
    listeners: Vec<(ListenerHandle, Box<dyn RedrawListener>)>,
    next_listener_id: u64,
}

impl fmt::Debug for TransformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformState")
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("stable_ticks", &self.stable_ticks)
            .field("committed", &self.committed)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::new(&TransformSettings::default(), RoundTripGuard::default())
    }
}

impl TransformState {
    /// Starts at scale 1, no pan, and the configured initial dpr. The
    /// starting transform is treated as committed.
    pub fn new(settings: &TransformSettings, guard: RoundTripGuard) -> Self {
        let current = Transform::new(1.0, 0.0, 0.0, settings.initial_dpr);
        Self {
            current,
            min_scale: settings.min_scale,
            max_scale: settings.max_scale,
            stable_ticks_required: settings.stable_ticks_required,
            guard,
            phase: SessionPhase::Stable,
            stable_ticks: 0,
            last_hash: None,
            committed: Some(current),
            fit: None,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    pub fn get(&self) -> Transform {
        self.current
    }

    pub fn guard(&self) -> &RoundTripGuard {
        &self.guard
    }

    pub fn session(&self) -> TransformSession {
        TransformSession {
            phase: self.phase,
            stable_ticks: self.stable_ticks,
            last_hash: self.last_hash,
            can_persist: self.phase == SessionPhase::Stable,
            committed: self.committed,
            fit: self.fit,
        }
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        scale.min(self.max_scale).max(self.min_scale)
    }

    /// Applies a partial update.
    ///
    /// Rejected fields are left unchanged and reported; the first one is
    /// returned as the outcome's warning. A call that rejects every field it
    /// carries does not count as a stability tick.
    pub fn set(&mut self, patch: TransformPatch) -> Outcome<Transform> {
        let mut next = self.current;
        let mut warnings = Vec::new();
        let mut accepted = 0;

        if let Some(scale) = patch.scale {
            if scale.is_finite() && scale > 0.0 {
                next.scale = self.clamp_scale(scale);
                accepted += 1;
            } else {
                warnings.push(GeometryWarning::RejectedTransformField {
                    field: "scale",
                    value: scale,
                });
            }
        }
        for (field, value, slot) in [
            ("pan_x", patch.pan_x, &mut next.pan_x),
            ("pan_y", patch.pan_y, &mut next.pan_y),
        ] {
            if let Some(value) = value {
                if value.is_finite() {
                    *slot = value;
                    accepted += 1;
                } else {
                    warnings.push(GeometryWarning::RejectedTransformField { field, value });
                }
            }
        }
        if let Some(dpr) = patch.dpr {
            if dpr.is_finite() && dpr > 0.0 {
                next.dpr = dpr;
                accepted += 1;
            } else {
                warnings.push(GeometryWarning::RejectedTransformField {
                    field: "dpr",
                    value: dpr,
                });
            }
        }

        if accepted > 0 || patch.is_empty() {
            let changed = next != self.current;
            self.current = next;
            self.advance_session();
            if changed {
                self.notify();
            }
        }

        let mut warnings = warnings.into_iter();
        match warnings.next() {
            None => Outcome::clean(self.current),
            Some(first) => {
                for extra in warnings {
                    tracing::warn!(target: "labelkit::geometry", "{}", extra);
                }
                Outcome::warned(self.current, first)
            }
        }
    }

    fn advance_session(&mut self) {
        let hash = TransformHash::from(&self.current);
        if self.last_hash != Some(hash) {
            self.last_hash = Some(hash);
            self.stable_ticks = 0;
            if self.phase != SessionPhase::Mutating {
                tracing::debug!("Transform session {} -> mutating", self.phase);
            }
            self.phase = SessionPhase::Mutating;
            return;
        }

        self.stable_ticks = self.stable_ticks.saturating_add(1);
        if self.phase == SessionPhase::Mutating && self.stable_ticks >= self.stable_ticks_required
        {
            if self.guard.passes(&self.current) {
                self.phase = SessionPhase::Stable;
                self.committed = Some(self.current);
                tracing::debug!("Transform session stable at {}", self.current);
            } else {
                self.phase = SessionPhase::Desynced;
                tracing::warn!(
                    target: "labelkit::geometry",
                    "Transform session desynced: round-trip error {:.3} css px at {}",
                    self.guard.round_trip_error(&self.current),
                    self.current
                );
            }
        }
    }

    /// Moves the view by a CSS-pixel delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Outcome<Transform> {
        let t = self.current;
        self.set(TransformPatch::new().pan(t.pan_x + dx, t.pan_y + dy))
    }

    /// Multiplies the scale by `factor`, keeping the image point under
    /// `anchor_css` at the same screen position.
    pub fn zoom_at(&mut self, anchor_css: Point, factor: f64) -> Outcome<Transform> {
        if !(factor.is_finite() && factor > 0.0) {
            return Outcome::warned(
                self.current,
                GeometryWarning::RejectedTransformField {
                    field: "zoom_factor",
                    value: factor,
                },
            );
        }
        if !anchor_css.is_finite() {
            return Outcome::warned(
                self.current,
                GeometryWarning::InvalidPoint {
                    x: anchor_css.x,
                    y: anchor_css.y,
                },
            );
        }

        let t = self.current;
        let new_scale = self.clamp_scale(t.scale * factor);
        let image_x = (anchor_css.x - t.pan_x) / t.scale;
        let image_y = (anchor_css.y - t.pan_y) / t.scale;
        self.set(
            TransformPatch::new()
                .scale(new_scale)
                .pan(anchor_css.x - image_x * new_scale, anchor_css.y - image_y * new_scale),
        )
    }

    pub fn zoom_in_at(&mut self, anchor_css: Point) -> Outcome<Transform> {
        self.zoom_at(anchor_css, ZOOM_STEP)
    }

    pub fn zoom_out_at(&mut self, anchor_css: Point) -> Outcome<Transform> {
        self.zoom_at(anchor_css, 1.0 / ZOOM_STEP)
    }

    /// Scales the image to the viewport and centers it.
    pub fn fit_image(
        &mut self,
        natural: Size,
        viewport_css: Size,
        mode: FitMode,
    ) -> Outcome<Transform> {
        let (scale, warning) = compute_scale_for_fit(natural, viewport_css, mode).into_parts();
        let scale = self.clamp_scale(scale);
        let pan_x = (viewport_css.w - natural.w * scale) / 2.0;
        let pan_y = (viewport_css.h - natural.h * scale) / 2.0;

        if warning.is_some() {
            self.fit = None;
        } else {
            self.fit = Some(FitRecord {
                natural,
                viewport_css,
                mode,
                scale,
            });
        }

        let outcome = if pan_x.is_finite() && pan_y.is_finite() {
            self.set(TransformPatch::new().scale(scale).pan(pan_x, pan_y))
        } else {
            self.set(TransformPatch::new().scale(scale))
        };
        match warning {
            Some(warning) => Outcome::warned(outcome.into_value(), warning),
            None => outcome,
        }
    }

    /// Back to scale 1 and no pan, keeping the device pixel ratio.
    pub fn reset(&mut self) -> Outcome<Transform> {
        self.fit = None;
        self.set(TransformPatch::new().scale(1.0).pan(0.0, 0.0))
    }

    pub fn add_listener<L>(&mut self, listener: L) -> ListenerHandle
    where
        L: RedrawListener + 'static,
    {
        let handle = ListenerHandle(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Returns false if the handle was not registered.
    pub fn remove_listener(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener.on_transform_changed(&self.current);
        }
    }
}
