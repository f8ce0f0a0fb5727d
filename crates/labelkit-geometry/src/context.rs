//! Per-document geometry state.
//!
//! Everything the geometry calls need beyond their arguments lives in a
//! [`GeometryContext`] that the host creates once per viewing session and
//! passes down by reference.

use labelkit_core::{Error, Result};
use labelkit_settings::Config;

use crate::anchor::AnchorCache;
use crate::store::AnnotationStore;
use crate::stroke::Stroke;
use crate::transform::{RoundTripGuard, TransformState};

#[derive(Debug)]
pub struct GeometryContext {
    transform: TransformState,
    anchors: AnchorCache,
    config: Config,
    migration_complete: bool,
}

impl Default for GeometryContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl GeometryContext {
    pub fn new(config: Config) -> Self {
        let guard = RoundTripGuard::from_settings(&config.placement);
        Self {
            transform: TransformState::new(&config.transform, guard),
            anchors: AnchorCache::new(),
            config,
            migration_complete: false,
        }
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut TransformState {
        &mut self.transform
    }

    pub fn anchors(&self) -> &AnchorCache {
        &self.anchors
    }

    pub fn anchors_mut(&mut self) -> &mut AnchorCache {
        &mut self.anchors
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn guard(&self) -> &RoundTripGuard {
        self.transform.guard()
    }

    /// True once [`run_offset_migration`](crate::migration::run_offset_migration)
    /// has run against this context.
    pub fn is_migration_complete(&self) -> bool {
        self.migration_complete
    }

    pub(crate) fn mark_migration_complete(&mut self) {
        self.migration_complete = true;
    }

    /// Adds or replaces a stroke and invalidates the image's anchors.
    pub fn insert_stroke(
        &mut self,
        store: &mut AnnotationStore,
        image: &str,
        label: impl Into<String>,
        stroke: Stroke,
    ) -> Result<()> {
        store.image_mut(image)?.strokes.insert(label.into(), stroke);
        self.anchors.invalidate_anchor_cache(image);
        Ok(())
    }

    /// Mutates a stroke in place and invalidates the image's anchors.
    pub fn edit_stroke<F>(
        &mut self,
        store: &mut AnnotationStore,
        image: &str,
        label: &str,
        edit: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Stroke),
    {
        let stroke = store
            .image_mut(image)?
            .strokes
            .get_mut(label)
            .ok_or_else(|| Error::UnknownStroke {
                image: image.to_string(),
                stroke: label.to_string(),
            })?;
        edit(stroke);
        self.anchors.invalidate_anchor_cache(image);
        Ok(())
    }

    /// Deletes a stroke together with every offset record it owns.
    pub fn remove_stroke(
        &mut self,
        store: &mut AnnotationStore,
        image: &str,
        label: &str,
    ) -> Result<Stroke> {
        let record = store.image_mut(image)?;
        let stroke = record
            .strokes
            .remove(label)
            .ok_or_else(|| Error::UnknownStroke {
                image: image.to_string(),
                stroke: label.to_string(),
            })?;
        record.label_offsets.remove(label);
        record.absolute_positions.remove(label);
        record.relative_positions.remove(label);
        record.offset_rotation_stamps.remove(label);
        self.anchors.invalidate_anchor_cache(image);
        tracing::debug!("Removed stroke {}/{} and its offsets", image, label);
        Ok(stroke)
    }
}
