//! Grid tool state.

use std::sync::Arc;

use pixbatch_common::frame::FrameSlot;
use pixbatch_model::asset::{ActiveSet, AssetId, ImageAsset, ModelError, MoveDirection};
use pixbatch_model::geometry::Point2D;
use pixbatch_model::settings::GridSettings;

/// Images, settings, and preview pan for the grid tool.
#[derive(Debug, Default)]
pub struct GridWorkspace {
    set: ActiveSet,
    pub settings: GridSettings,
    pan: Pan,
}

/// Preview pan offset in screen pixels. Display only; never exported.
#[derive(Debug, Default)]
struct Pan {
    offset: (f64, f64),
    drag: Option<(Point2D, (f64, f64))>,
    pending: FrameSlot<(f64, f64)>,
}

impl GridWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) -> &ActiveSet {
        &self.set
    }

    /// Append images in order, all active.
    pub fn add_images(
        &mut self,
        assets: impl IntoIterator<Item = Arc<ImageAsset>>,
    ) -> Result<(), ModelError> {
        self.set.extend(assets)
    }

    pub fn remove(&mut self, id: &AssetId) -> Option<Arc<ImageAsset>> {
        self.set.remove(id)
    }

    pub fn move_entry(&mut self, index: usize, direction: MoveDirection) -> bool {
        self.set.move_entry(index, direction)
    }

    pub fn toggle_active(&mut self, id: &AssetId) -> Result<bool, ModelError> {
        self.set.toggle_active(id)
    }

    /// Remove every image, returning them in order.
    pub fn clear(&mut self) -> Vec<Arc<ImageAsset>> {
        self.pan = Pan::default();
        self.set.clear()
    }

    /// Active images in cell order.
    pub fn active_assets(&self) -> Vec<Arc<ImageAsset>> {
        self.set.active_assets()
    }

    /// Whether `id` is used by this workspace, background included.
    pub fn references(&self, id: &AssetId) -> bool {
        self.set.contains(id)
            || self
                .settings
                .background_image
                .as_ref()
                .is_some_and(|bg| bg.id() == id)
    }

    pub fn pan_offset(&self) -> (f64, f64) {
        self.pan.offset
    }

    pub fn begin_pan(&mut self, screen: Point2D) {
        self.pan.drag = Some((screen, self.pan.offset));
    }

    /// Schedule a pan for the next tick. Returns false when no pan is active.
    pub fn pan_move(&mut self, screen: Point2D) -> bool {
        let Some((start, origin)) = self.pan.drag else {
            return false;
        };
        let (dx, dy) = screen.delta_from(&start);
        self.pan.pending.schedule((origin.0 + dx, origin.1 + dy));
        true
    }

    pub fn end_pan(&mut self) {
        self.pan.drag = None;
    }

    pub fn reset_pan(&mut self) {
        self.pan = Pan::default();
    }

    /// Repaint tick: apply the newest scheduled pan.
    pub fn tick(&mut self) -> bool {
        match self.pan.pending.drain() {
            Some(offset) => {
                self.pan.offset = offset;
                true
            }
            None => false,
        }
    }
}
