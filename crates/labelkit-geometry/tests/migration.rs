//! Integration tests for migrating stored documents

use labelkit_core::Size;
use labelkit_geometry::{
    is_migration_complete, run_offset_migration, validate_offset_format, AnnotationStore,
    GeometryContext, Offset,
};
use serde_json::json;
use tempfile::TempDir;

const DOCUMENT: &str = r#"{
  "images": {
    "front": {
      "natural": { "w": 800, "h": 400 },
      "strokes": {
        "A1": {
          "points": [{ "x": 100, "y": 100 }, { "x": 300, "y": 100 }],
          "type": "straight"
        },
        "A2": { "points": [{ "x": 50, "y": 50 }, { "x": 50, "y": 250 }] }
      },
      "labelOffsets": {
        "A1": { "x": 40, "y": -20 },
        "A2": {
          "kind": "norm",
          "dx_norm": 0.1,
          "dy_norm": 0.0,
          "normRef": { "w": 800, "h": 400 },
          "version": 2
        }
      }
    },
    "sketch": {
      "hasBitmap": false,
      "strokes": {},
      "labelOffsets": { "B1": { "x": 5, "y": 5 } }
    }
  }
}"#;

#[test]
fn test_migration_normalizes_legacy_offsets() {
    let mut ctx = GeometryContext::default();
    let mut store = AnnotationStore::from_json_str(DOCUMENT).unwrap();
    assert!(!is_migration_complete(&ctx));

    let report = run_offset_migration(&mut ctx, &mut store);
    assert_eq!(report.images_scanned, 2);
    assert_eq!(report.offsets_migrated, 1);
    assert_eq!(report.already_normalized, 1);
    assert_eq!(report.skipped_images, vec!["sketch".to_string()]);
    assert!(is_migration_complete(&ctx));

    let front = store.image("front").unwrap();
    let a1 = front.label_offsets["A1"];
    assert_eq!(a1, Offset::normalized(0.05, -0.05, Size::new(800.0, 400.0)));
    assert!(validate_offset_format(&a1));

    // Unknown dimensions: left in the legacy schema
    let sketch = store.image("sketch").unwrap();
    assert_eq!(sketch.label_offsets["B1"], Offset::legacy(5.0, 5.0));
}

#[test]
fn test_migrated_wire_shape() {
    let mut ctx = GeometryContext::default();
    let mut store = AnnotationStore::from_json_str(DOCUMENT).unwrap();
    run_offset_migration(&mut ctx, &mut store);

    let value: serde_json::Value =
        serde_json::from_str(&store.to_json_string_pretty().unwrap()).unwrap();
    assert_eq!(
        value["images"]["front"]["labelOffsets"]["A1"],
        json!({
            "kind": "norm",
            "dx_norm": 0.05,
            "dy_norm": -0.05,
            "normRef": { "w": 800.0, "h": 400.0 },
            "version": 2
        })
    );
    assert_eq!(
        value["images"]["sketch"]["labelOffsets"]["B1"],
        json!({ "x": 5.0, "y": 5.0 })
    );
}

#[test]
fn test_second_run_is_noop() {
    let mut ctx = GeometryContext::default();
    let mut store = AnnotationStore::from_json_str(DOCUMENT).unwrap();
    run_offset_migration(&mut ctx, &mut store);
    let first = store.to_json_string_pretty().unwrap();

    let report = run_offset_migration(&mut ctx, &mut store);
    assert!(report.is_noop());
    assert_eq!(report.already_normalized, 2);
    assert_eq!(store.to_json_string_pretty().unwrap(), first);
}

#[test]
fn test_migration_through_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("document.json");
    std::fs::write(&path, DOCUMENT).unwrap();

    let mut ctx = GeometryContext::default();
    let mut store = AnnotationStore::load(&path).unwrap();
    run_offset_migration(&mut ctx, &mut store);
    store.save(&path).unwrap();

    let reloaded = AnnotationStore::load(&path).unwrap();
    assert_eq!(reloaded, store);
    assert!(!reloaded.image("front").unwrap().has_legacy_offsets());
    assert!(reloaded.image("sketch").unwrap().has_legacy_offsets());
}

#[test]
fn test_malformed_offset_fails_to_load() {
    let doc = r#"{
      "images": {
        "front": { "labelOffsets": { "A1": { "kind": "norm", "dx_norm": 0.1 } } }
      }
    }"#;
    assert!(AnnotationStore::from_json_str(doc).is_err());
}
