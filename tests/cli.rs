//! End-to-end tests for the document commands

use std::path::{Path, PathBuf};

use labelkit::cli::{check_document, migrate_document, transform_document, DocumentArgs};
use labelkit::{AnnotationStore, Config, ContentTransform, FlipDirection, Offset, Point, Size};
use tempfile::TempDir;

const DOCUMENT: &str = r#"{
  "images": {
    "front": {
      "natural": { "w": 800, "h": 400 },
      "strokes": {
        "A1": { "points": [{ "x": 100, "y": 100 }, { "x": 300, "y": 100 }] }
      },
      "labelOffsets": { "A1": { "x": 40, "y": -20 } }
    }
  }
}"#;

fn write_document(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("document.json");
    std::fs::write(&path, content).unwrap();
    path
}

fn args(document: &Path) -> DocumentArgs {
    DocumentArgs {
        document: document.to_path_buf(),
        output: None,
        dry_run: false,
    }
}

#[test]
fn test_migrate_in_place() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);

    let report = migrate_document(Config::default(), &args(&path)).unwrap();
    assert_eq!(report.offsets_migrated, 1);

    let store = AnnotationStore::load(&path).unwrap();
    assert_eq!(
        store.image("front").unwrap().label_offsets["A1"],
        Offset::normalized(0.05, -0.05, Size::new(800.0, 400.0))
    );
    assert!(check_document(&path).unwrap().is_clean());
}

#[test]
fn test_migrate_dry_run_leaves_document() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);
    let mut dry = args(&path);
    dry.dry_run = true;

    let report = migrate_document(Config::default(), &dry).unwrap();
    assert_eq!(report.offsets_migrated, 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), DOCUMENT);
}

#[test]
fn test_migrate_to_output() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);
    let output = dir.path().join("out").join("migrated.json");
    let mut to_output = args(&path);
    to_output.output = Some(output.clone());

    migrate_document(Config::default(), &to_output).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), DOCUMENT);
    let migrated = AnnotationStore::load(&output).unwrap();
    assert!(!migrated.image("front").unwrap().has_legacy_offsets());
}

#[test]
fn test_rotate_document() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);

    let report = transform_document(
        Config::default(),
        &args(&path),
        "front",
        ContentTransform::Rotate(90.0),
    )
    .unwrap();
    assert!(report.applied);

    let store = AnnotationStore::load(&path).unwrap();
    let record = store.image("front").unwrap();
    assert_eq!(record.natural, Some(Size::new(400.0, 800.0)));
    assert_eq!(record.strokes["A1"].points[0], Point::new(300.0, 100.0));
    // Legacy offsets are rotated as vectors and stay legacy
    assert_eq!(record.label_offsets["A1"], Offset::legacy(20.0, 40.0));
}

#[test]
fn test_flip_document() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);

    transform_document(
        Config::default(),
        &args(&path),
        "front",
        ContentTransform::Flip(FlipDirection::Vertical),
    )
    .unwrap();

    let store = AnnotationStore::load(&path).unwrap();
    let record = store.image("front").unwrap();
    assert_eq!(record.strokes["A1"].points[0], Point::new(100.0, 300.0));
    assert_eq!(record.label_offsets["A1"], Offset::legacy(40.0, 20.0));
}

#[test]
fn test_rejected_rotation_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);

    let result = transform_document(
        Config::default(),
        &args(&path),
        "front",
        ContentTransform::Rotate(30.0),
    );
    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), DOCUMENT);
}

#[test]
fn test_unknown_image_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);
    let result = transform_document(
        Config::default(),
        &args(&path),
        "back",
        ContentTransform::Rotate(90.0),
    );
    assert!(result.is_err());
}

#[test]
fn test_check_reports_every_problem() {
    let dir = TempDir::new().unwrap();
    let path = write_document(
        &dir,
        r#"{
          "images": {
            "front": {
              "labelOffsets": {
                "A1": { "x": 40, "y": -20 },
                "A2": {
                  "kind": "norm", "dx_norm": 0.1, "dy_norm": 0.2,
                  "normRef": { "w": 800, "h": 400 }, "version": 2
                },
                "A3": {
                  "kind": "norm", "dx_norm": 0.1, "dy_norm": 0.2,
                  "normRef": { "w": 800, "h": 400 }, "version": 3
                },
                "A4": {
                  "kind": "norm", "dx_norm": 0.1, "dy_norm": 0.2,
                  "normRef": { "w": 0, "h": 400 }, "version": 2
                }
              }
            },
            "back": {}
          }
        }"#,
    );

    let check = check_document(&path).unwrap();
    assert_eq!(check.images, 2);
    assert_eq!(check.normalized, 1);
    assert_eq!(check.legacy(), 1);
    assert_eq!(check.malformed(), 2);
    assert!(!check.is_clean());

    let summary = check.to_string();
    assert!(summary.contains("front/A1: legacy pixel offset"));
    assert!(summary.ends_with("2 image(s), 1 normalized, 1 legacy, 2 malformed\n"));
}

#[test]
fn test_config_file_changes_fallback_reference() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("labelkit.toml");
    let mut config = Config::default();
    config.migration.default_reference = Size::new(1000.0, 500.0);
    config.save_to_file(&config_path).unwrap();

    let loaded = Config::load_or_default(Some(&config_path)).unwrap();
    assert_eq!(loaded.migration.default_reference, Size::new(1000.0, 500.0));
}
