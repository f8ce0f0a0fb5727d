//! Annotation store model.
//!
//! The store is owned by the host application; this crate reads and updates
//! it through the types below. Its JSON form is also the document the
//! migration CLI works on.

use std::collections::BTreeMap;
use std::path::Path;

use labelkit_core::{Error, Point, Result, Size};
use serde::{Deserialize, Serialize};

use crate::offset::Offset;
use crate::relative::RelativePosition;
use crate::stroke::Stroke;

/// Everything attached to one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageRecord {
    /// Natural pixel size, when the image has been decoded at least once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural: Option<Size>,
    /// False for drawing-only canvases with no backing photograph
    pub has_bitmap: bool,
    pub strokes: BTreeMap<String, Stroke>,
    /// Label offsets by stroke label
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub label_offsets: BTreeMap<String, Offset>,
    /// Absolute image-space label positions by stroke label
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub absolute_positions: BTreeMap<String, Point>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relative_positions: BTreeMap<String, RelativePosition>,
    /// Rotation (radians) applied to each stroke's offset since it was set
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub offset_rotation_stamps: BTreeMap<String, f64>,
    /// Fixed pivot for rotating bitmap-less content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_pivot: Option<Point>,
    /// Cumulative content rotation in radians, within (-π, π]
    pub rotation: f64,
}

impl Default for ImageRecord {
    fn default() -> Self {
        Self {
            natural: None,
            has_bitmap: true,
            strokes: BTreeMap::new(),
            label_offsets: BTreeMap::new(),
            absolute_positions: BTreeMap::new(),
            relative_positions: BTreeMap::new(),
            offset_rotation_stamps: BTreeMap::new(),
            rotation_pivot: None,
            rotation: 0.0,
        }
    }
}

impl ImageRecord {
    /// A photograph of known size.
    pub fn with_natural(natural: Size) -> Self {
        Self {
            natural: Some(natural),
            ..Self::default()
        }
    }

    /// A drawing canvas with no bitmap behind it.
    pub fn blank(size: Size) -> Self {
        Self {
            natural: Some(size),
            has_bitmap: false,
            ..Self::default()
        }
    }

    /// Natural size if it is known and non-zero.
    pub fn usable_natural(&self) -> Option<Size> {
        self.natural.filter(Size::is_usable)
    }

    pub fn has_legacy_offsets(&self) -> bool {
        self.label_offsets.values().any(|o| !o.is_normalized())
    }

    pub fn stroke(&self, label: &str) -> Option<&Stroke> {
        self.strokes.get(label)
    }
}

/// All images of a document, ordered by label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationStore {
    #[serde(default)]
    pub images: BTreeMap<String, ImageRecord>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&mut self, label: impl Into<String>, record: ImageRecord) {
        self.images.insert(label.into(), record);
    }

    pub fn image(&self, label: &str) -> Result<&ImageRecord> {
        self.images.get(label).ok_or_else(|| Error::UnknownImage {
            image: label.to_string(),
        })
    }

    pub fn image_mut(&mut self, label: &str) -> Result<&mut ImageRecord> {
        self.images.get_mut(label).ok_or_else(|| Error::UnknownImage {
            image: label.to_string(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a store from a JSON document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_json_str(&content)?;
        tracing::debug!(
            "Loaded {} image(s) from {}",
            store.images.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_string_pretty()?)?;
        Ok(())
    }
}
