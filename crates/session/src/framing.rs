//! Framing tool state: batch, shared extras, placements, and the pointer controller.

use std::sync::Arc;

use pixbatch_common::config::{EngineConfig, ExportDefaults};
use pixbatch_common::error::{PixbatchError, PixbatchResult};
use pixbatch_layout::placement::extra_layer_transform;
use pixbatch_model::asset::{AssetId, ImageAsset, ModelError};
use pixbatch_model::geometry::Point2D;
use pixbatch_model::settings::FramingSettings;
use pixbatch_model::transform::{PlacedLayer, PlacementTransform, TransformPatch};
use pixbatch_placement::controller::ManipulationController;
use pixbatch_placement::store::TransformStore;
use pixbatch_render_engine::export::{DeliveryMode, ExportJob};

use crate::batch::{Batch, Navigation};

/// State of the framing tool.
///
/// The on-screen subject is the current batch item. Extras are shared by
/// every item and drawn above the subject in insertion order.
#[derive(Debug)]
pub struct FramingWorkspace {
    batch: Batch,
    extras: Vec<Arc<ImageAsset>>,
    store: TransformStore,
    controller: ManipulationController,
    settings: FramingSettings,
    /// Host UX flag. Placements are kept per item either way.
    pub auto_save: bool,
}

impl FramingWorkspace {
    pub fn new(config: &EngineConfig) -> Self {
        let settings = FramingSettings::default();
        Self {
            batch: Batch::new(),
            extras: Vec::new(),
            store: TransformStore::new(settings.canvas_size(), config.placement.clone()),
            controller: ManipulationController::new(config.preview.zoom, config.placement.clone()),
            settings,
            auto_save: true,
        }
    }

    pub fn settings(&self) -> &FramingSettings {
        &self.settings
    }

    /// Replace the settings. The overlay already attached is kept.
    pub fn set_settings(&mut self, settings: FramingSettings) -> PixbatchResult<()> {
        settings.validate()?;
        let overlay = self.settings.frame_overlay.take();
        self.settings = settings;
        if self.settings.frame_overlay.is_none() {
            self.settings.frame_overlay = overlay;
        }
        self.sync_canvas();
        Ok(())
    }

    /// Attach or clear the overlay. An overlay sets the canvas to its own size.
    pub fn set_frame_overlay(&mut self, overlay: Option<Arc<ImageAsset>>) -> Option<Arc<ImageAsset>> {
        let previous = self.settings.frame_overlay.take();
        self.settings.set_frame_overlay(overlay);
        self.sync_canvas();
        previous
    }

    pub fn store(&self) -> &TransformStore {
        &self.store
    }

    pub fn controller(&self) -> &ManipulationController {
        &self.controller
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn extras(&self) -> &[Arc<ImageAsset>] {
        &self.extras
    }

    pub fn add_images(
        &mut self,
        assets: impl IntoIterator<Item = Arc<ImageAsset>>,
    ) -> Result<(), ModelError> {
        self.batch.extend(assets)
    }

    /// Remove a batch item and forget its placement.
    pub fn remove_image(&mut self, id: &AssetId) -> Option<Arc<ImageAsset>> {
        let removed = self.batch.remove(id)?;
        self.forget(id);
        Some(removed)
    }

    /// Add a layer shared by every item, at the fixed extra-layer default.
    pub fn add_extra(&mut self, asset: Arc<ImageAsset>) -> Result<(), ModelError> {
        if self.extras.iter().any(|e| e.id() == asset.id()) {
            return Err(ModelError::DuplicateId {
                id: asset.id().to_string(),
            });
        }
        self.store
            .seed(asset.id().clone(), extra_layer_transform(self.store.limits()));
        self.extras.push(asset);
        Ok(())
    }

    pub fn remove_extra(&mut self, id: &AssetId) -> Option<Arc<ImageAsset>> {
        let index = self.extras.iter().position(|e| e.id() == id)?;
        self.forget(id);
        Some(self.extras.remove(index))
    }

    pub fn clear(&mut self) -> Vec<Arc<ImageAsset>> {
        self.controller.cancel();
        self.controller.select(None);
        self.store.clear();
        let mut removed = self.batch.clear();
        removed.append(&mut self.extras);
        removed
    }

    /// Move to another batch item. Any in-flight manipulation lands first.
    pub fn navigate(&mut self, to: Navigation) -> bool {
        self.settle();
        let moved = self.batch.navigate(to);
        if moved {
            tracing::debug!(index = self.batch.current_index(), "Framing item changed");
        }
        moved
    }

    pub fn current(&self) -> Option<&Arc<ImageAsset>> {
        self.batch.current()
    }

    /// Layers on screen: the current subject, then extras.
    pub fn layers(&mut self) -> Vec<PlacedLayer> {
        let mut layers = Vec::with_capacity(1 + self.extras.len());
        if let Some(subject) = self.batch.current() {
            let transform = self.store.get(subject);
            layers.push(PlacedLayer::new(Arc::clone(subject), transform));
        }
        for extra in &self.extras {
            let transform = self.store.get(extra);
            layers.push(PlacedLayer::new(Arc::clone(extra), transform));
        }
        layers
    }

    pub fn pointer_down(&mut self, screen: Point2D) -> Option<AssetId> {
        let layers = self.layers();
        self.controller.pointer_down(screen, &layers, &mut self.store)
    }

    pub fn pointer_move(&mut self, screen: Point2D) -> bool {
        self.controller.pointer_move(screen)
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    /// Start a scale drag on the handle of layer `id`.
    pub fn begin_scale(&mut self, screen: Point2D, id: &AssetId) -> bool {
        let layers = self.layers();
        match layers.iter().find(|l| l.id() == id) {
            Some(layer) => {
                self.controller.begin_scale(screen, layer, &mut self.store);
                true
            }
            None => false,
        }
    }

    /// Wheel over the selected layer.
    pub fn wheel(&mut self, notches: f64) -> bool {
        let layers = self.layers();
        let Some(layer) = self
            .controller
            .selected()
            .and_then(|id| layers.iter().find(|l| l.id() == id))
        else {
            return false;
        };
        self.controller.wheel(notches, layer, &mut self.store)
    }

    /// Rotate the selected layer by `steps` rotate clicks.
    pub fn rotate_selected(&mut self, steps: f64) -> Option<PlacementTransform> {
        let layers = self.layers();
        self.controller
            .rotate_selected(steps, &layers, &mut self.store)
    }

    /// Direct edit from a form control (scale slider, visibility toggle).
    ///
    /// Goes through the same store entry point as pointer manipulation. A
    /// pending pointer update lands first so it cannot overwrite this edit.
    pub fn edit(&mut self, id: &AssetId, patch: &TransformPatch) -> PixbatchResult<PlacementTransform> {
        let asset = self
            .find(id)
            .cloned()
            .ok_or_else(|| PixbatchError::unknown_item(id.as_str()))?;
        self.controller.tick(&mut self.store);
        Ok(self.store.update(&asset, patch))
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.controller.set_zoom(zoom);
    }

    /// Repaint tick: apply the coalesced pointer update.
    pub fn tick(&mut self) -> Option<PlacementTransform> {
        self.controller.tick(&mut self.store)
    }

    /// Whether `id` is used by this workspace, overlay included.
    pub fn references(&self, id: &AssetId) -> bool {
        self.batch.contains(id)
            || self.extras.iter().any(|e| e.id() == id)
            || self
                .settings
                .frame_overlay
                .as_ref()
                .is_some_and(|o| o.id() == id)
    }

    /// Export every batch item with the shared extras.
    pub fn export_job(&self, delivery: DeliveryMode, defaults: &ExportDefaults, millis: i64) -> ExportJob {
        let extras: Vec<PlacedLayer> = self
            .extras
            .iter()
            .map(|extra| {
                let fallback = extra_layer_transform(self.store.limits());
                PlacedLayer::new(Arc::clone(extra), self.store.resolve_or(extra.id(), &fallback))
            })
            .collect();
        ExportJob::framing(
            &self.settings,
            self.batch.items(),
            &self.store,
            self.batch.current().map(|a| a.as_ref()),
            &extras,
            delivery,
            defaults,
            millis,
        )
    }

    fn find(&self, id: &AssetId) -> Option<&Arc<ImageAsset>> {
        self.batch
            .find(id)
            .or_else(|| self.extras.iter().find(|e| e.id() == id))
    }

    fn forget(&mut self, id: &AssetId) {
        if self.controller.state().target() == Some(id) {
            self.controller.cancel();
        }
        if self.controller.selected() == Some(id) {
            self.controller.select(None);
        }
        self.store.remove(id);
    }

    fn settle(&mut self) {
        self.controller.tick(&mut self.store);
        self.controller.cancel();
        self.controller.select(None);
    }

    fn sync_canvas(&mut self) {
        let canvas = self.settings.canvas_size();
        if canvas != self.store.canvas() {
            tracing::debug!(width = canvas.width, height = canvas.height, "Framing canvas changed");
            self.store.set_canvas(canvas);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixbatch_model::asset::PixelSource;
    use pixbatch_model::geometry::CanvasSize;

    fn asset(id: &str, w: u32, h: u32) -> Arc<ImageAsset> {
        Arc::new(
            ImageAsset::new(
                AssetId::from(id),
                format!("{id}.png"),
                PixelSource::Encoded(Arc::from(Vec::<u8>::new())),
                w,
                h,
            )
            .unwrap(),
        )
    }

    fn workspace() -> FramingWorkspace {
        FramingWorkspace::new(&EngineConfig::default())
    }

    #[test]
    fn test_overlay_adopts_and_restores_canvas() {
        let mut ws = workspace();
        ws.set_frame_overlay(Some(asset("frame", 800, 600)));
        assert_eq!(ws.store().canvas(), CanvasSize::new(800, 600));

        let previous = ws.set_frame_overlay(None);
        assert_eq!(previous.unwrap().id().as_str(), "frame");
        assert_eq!(ws.store().canvas(), CanvasSize::new(1080, 1080));
    }

    #[test]
    fn test_extras_get_fixed_default_and_follow_subject() {
        let mut ws = workspace();
        ws.add_images([asset("a", 100, 100)]).unwrap();
        ws.add_extra(asset("logo", 400, 200)).unwrap();

        let layers = ws.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].transform, PlacementTransform::new(100.0, 100.0, 0.15, 0.0));
        assert!(ws.add_extra(asset("logo", 400, 200)).is_err());
    }

    #[test]
    fn test_edit_scale_is_clamped() {
        let mut ws = workspace();
        ws.add_images([asset("a", 100, 100)]).unwrap();
        let t = ws.edit(&AssetId::from("a"), &TransformPatch::scale(50.0)).unwrap();
        assert_eq!(t.scale, 10.0);
        assert!(ws.edit(&AssetId::from("missing"), &TransformPatch::scale(1.0)).is_err());
    }

    #[test]
    fn test_navigation_lands_pending_drag() {
        let mut ws = workspace();
        ws.add_images([asset("a", 100, 100), asset("b", 100, 100)]).unwrap();
        ws.set_zoom(1.0);

        let start = ws.layers()[0].transform;
        let grab = Point2D::new(start.x + 5.0, start.y + 5.0);
        assert_eq!(ws.pointer_down(grab).unwrap().as_str(), "a");
        ws.pointer_move(Point2D::new(grab.x + 30.0, grab.y));

        assert!(ws.navigate(Navigation::Next));
        let moved = ws.store().peek(&AssetId::from("a")).unwrap();
        assert_eq!(moved.x, start.x + 30.0);
        assert!(ws.controller().selected().is_none());
    }

    #[test]
    fn test_remove_image_forgets_placement() {
        let mut ws = workspace();
        ws.add_images([asset("a", 100, 100)]).unwrap();
        ws.edit(&AssetId::from("a"), &TransformPatch::position(1.0, 1.0))
            .unwrap();
        assert!(ws.store().contains(&AssetId::from("a")));
        ws.remove_image(&AssetId::from("a"));
        assert!(!ws.store().contains(&AssetId::from("a")));
        assert!(!ws.references(&AssetId::from("a")));
    }
}
