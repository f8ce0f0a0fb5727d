//! Integration tests for transform session stability and the persistence gate

use labelkit_core::{Point, Transform};
use labelkit_geometry::{can_persist_offsets, GeometryContext, SessionPhase, TransformPatch};
use labelkit_settings::Config;

#[test]
fn test_stable_only_after_third_identical_set() {
    let mut ctx = GeometryContext::default();
    let patch = TransformPatch::from(Transform::new(2.0, 10.0, 10.0, 1.0));

    let mut phases = Vec::new();
    for _ in 0..4 {
        let _ = ctx.transform_mut().set(patch);
        phases.push(ctx.transform().session().phase);
    }

    assert_eq!(
        phases,
        vec![
            SessionPhase::Mutating,
            SessionPhase::Mutating,
            SessionPhase::Stable,
            SessionPhase::Stable,
        ]
    );
    assert!(can_persist_offsets(&ctx.transform().session(), ctx.guard()));
}

#[test]
fn test_configured_tick_requirement() {
    let mut config = Config::default();
    config.transform.stable_ticks_required = 4;
    let mut ctx = GeometryContext::new(config);
    let patch = TransformPatch::new().scale(3.0);

    for _ in 0..4 {
        let _ = ctx.transform_mut().set(patch);
    }
    assert_eq!(ctx.transform().session().phase, SessionPhase::Mutating);

    let _ = ctx.transform_mut().set(patch);
    assert_eq!(ctx.transform().session().phase, SessionPhase::Stable);
}

#[test]
fn test_pan_and_zoom_interrupt_stability() {
    let mut ctx = GeometryContext::default();
    let patch = TransformPatch::new().scale(2.0);
    for _ in 0..3 {
        let _ = ctx.transform_mut().set(patch);
    }
    assert_eq!(ctx.transform().session().phase, SessionPhase::Stable);

    let _ = ctx.transform_mut().pan_by(25.0, 0.0);
    let session = ctx.transform().session();
    assert_eq!(session.phase, SessionPhase::Mutating);
    assert!(!can_persist_offsets(&session, ctx.guard()));
    // The committed snapshot still refers to the last settled transform
    assert_eq!(session.committed, Some(Transform::new(2.0, 0.0, 0.0, 1.0)));

    let _ = ctx.transform_mut().zoom_in_at(Point::new(100.0, 100.0));
    assert_eq!(ctx.transform().session().stable_ticks, 0);
}

#[test]
fn test_dpr_change_resets_session() {
    let mut ctx = GeometryContext::default();
    for _ in 0..3 {
        let _ = ctx.transform_mut().set(TransformPatch::new());
    }
    assert_eq!(ctx.transform().session().phase, SessionPhase::Stable);

    let _ = ctx.transform_mut().set(TransformPatch::new().dpr(2.0));
    assert_eq!(ctx.transform().session().phase, SessionPhase::Mutating);
}

#[test]
fn test_rejected_update_does_not_tick() {
    let mut ctx = GeometryContext::default();
    let _ = ctx.transform_mut().set(TransformPatch::new().scale(2.0));
    let out = ctx.transform_mut().set(TransformPatch::new().dpr(f64::NAN));
    assert!(!out.is_clean());
    assert_eq!(ctx.transform().session().stable_ticks, 0);
}

#[test]
fn test_desynced_session_blocks_persistence() {
    let mut ctx = GeometryContext::default();
    let patch = TransformPatch::new().scale(1.337);
    for _ in 0..3 {
        let _ = ctx.transform_mut().set(patch);
    }
    let session = ctx.transform().session();
    assert_eq!(session.phase, SessionPhase::Desynced);
    assert!(!can_persist_offsets(&session, ctx.guard()));
}

#[test]
fn test_looser_tolerance_accepts_fractional_scale() {
    let mut config = Config::default();
    config.placement.roundtrip_tolerance_css = 1.0;
    let mut ctx = GeometryContext::new(config);
    let patch = TransformPatch::new().scale(1.337);
    for _ in 0..3 {
        let _ = ctx.transform_mut().set(patch);
    }
    assert_eq!(ctx.transform().session().phase, SessionPhase::Stable);
}
