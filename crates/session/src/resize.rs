//! Bulk resize tool state.

use std::collections::HashMap;
use std::sync::Arc;

use pixbatch_common::config::ExportDefaults;
use pixbatch_model::asset::{AssetId, ImageAsset, ModelError};
use pixbatch_model::geometry::PixelRect;
use pixbatch_model::settings::ResizeSettings;
use pixbatch_render_engine::decode::BitmapCache;
use pixbatch_render_engine::export::{DeliveryMode, ExportJob};

use crate::batch::{Batch, Navigation};

/// Batch, settings, and cached auto-crop bounds for the resize tool.
#[derive(Debug, Default)]
pub struct ResizeWorkspace {
    batch: Batch,
    pub settings: ResizeSettings,
    bounds: HashMap<AssetId, PixelRect>,
}

impl ResizeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn add_images(
        &mut self,
        assets: impl IntoIterator<Item = Arc<ImageAsset>>,
    ) -> Result<(), ModelError> {
        self.batch.extend(assets)
    }

    pub fn remove(&mut self, id: &AssetId) -> Option<Arc<ImageAsset>> {
        self.bounds.remove(id);
        self.batch.remove(id)
    }

    pub fn clear(&mut self) -> Vec<Arc<ImageAsset>> {
        self.bounds.clear();
        self.batch.clear()
    }

    pub fn navigate(&mut self, to: Navigation) -> bool {
        self.batch.navigate(to)
    }

    pub fn current(&self) -> Option<&Arc<ImageAsset>> {
        self.batch.current()
    }

    /// Opaque bounds of the current item, computed once from its decoded
    /// bitmap and cached by id. `None` until the bitmap is in `cache`.
    pub fn record_bounds(&mut self, cache: &BitmapCache) -> Option<PixelRect> {
        let current = self.batch.current()?;
        if let Some(bounds) = self.bounds.get(current.id()) {
            return Some(*bounds);
        }
        let bitmap = cache.get(current.id())?;
        let bounds = bitmap.opaque_bounds();
        tracing::debug!(
            id = %current.id(),
            x = bounds.x,
            y = bounds.y,
            width = bounds.width,
            height = bounds.height,
            "Opaque bounds cached"
        );
        self.bounds.insert(current.id().clone(), bounds);
        Some(bounds)
    }

    pub fn bounds(&self, id: &AssetId) -> Option<PixelRect> {
        self.bounds.get(id).copied()
    }

    pub fn references(&self, id: &AssetId) -> bool {
        self.batch.contains(id)
    }

    /// Export every item. Items without cached bounds get them computed at render time.
    pub fn export_job(&self, delivery: DeliveryMode, defaults: &ExportDefaults, millis: i64) -> ExportJob {
        ExportJob::resize(
            &self.settings,
            self.batch.items(),
            &self.bounds,
            delivery,
            defaults,
            millis,
        )
    }
}
