//! Pointer-driven manipulation of freeform layers.
//!
//! Pointer coordinates arrive in preview (screen) pixels and are unzoomed to
//! canvas pixels on entry. Moves are not written to the store immediately:
//! they are scheduled into a single pending slot and applied on the next
//! [`ManipulationController::tick`], so a burst of moves between repaints
//! collapses to the newest one.

use std::sync::Arc;

use pixbatch_common::config::PlacementLimits;
use pixbatch_common::frame::FrameSlot;
use pixbatch_model::asset::{AssetId, ImageAsset};
use pixbatch_model::geometry::Point2D;
use pixbatch_model::transform::{PlacedLayer, PlacementTransform, TransformPatch};

use crate::store::TransformStore;

/// Current manipulation. Only one is active at a time.
#[derive(Debug, Clone, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    Dragging {
        asset: Arc<ImageAsset>,
        /// Pointer at pointer-down, in canvas pixels.
        start_pointer: Point2D,
        start_transform: PlacementTransform,
    },
    Scaling {
        asset: Arc<ImageAsset>,
        start_pointer: Point2D,
        start_scale: f64,
    },
}

impl ControllerState {
    /// Id of the layer being manipulated, if any.
    pub fn target(&self) -> Option<&AssetId> {
        match self {
            Self::Idle => None,
            Self::Dragging { asset, .. } | Self::Scaling { asset, .. } => Some(asset.id()),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// An update waiting for the next repaint tick.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub asset: Arc<ImageAsset>,
    pub patch: TransformPatch,
}

/// Translates pointer input into [`TransformStore`] updates.
#[derive(Debug)]
pub struct ManipulationController {
    state: ControllerState,
    selected: Option<AssetId>,
    zoom: f64,
    limits: PlacementLimits,
    pending: FrameSlot<PendingUpdate>,
}

impl ManipulationController {
    pub fn new(zoom: f64, limits: PlacementLimits) -> Self {
        Self {
            state: ControllerState::Idle,
            selected: None,
            zoom: if zoom > 0.0 { zoom } else { 1.0 },
            limits,
            pending: FrameSlot::new(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn selected(&self) -> Option<&AssetId> {
        self.selected.as_ref()
    }

    /// Select a layer directly (e.g. from a layer list).
    pub fn select(&mut self, id: Option<AssetId>) {
        self.selected = id;
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Change the preview zoom. Ignored mid-manipulation and for non-positive values.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom > 0.0 && zoom.is_finite() && self.state.is_idle() {
            self.zoom = zoom;
        }
    }

    /// Whether an update is waiting for the next tick.
    pub fn has_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Moves replaced before they reached a tick.
    pub fn coalesced_updates(&self) -> u64 {
        self.pending.superseded()
    }

    /// Pointer pressed over the preview.
    ///
    /// `layers` are in ascending z-order. The currently selected layer wins
    /// if it is under the pointer; otherwise the topmost hit layer does. A
    /// press on empty canvas clears the selection. Presses while another
    /// manipulation is active are ignored. Returns the layer that started
    /// dragging.
    pub fn pointer_down(
        &mut self,
        screen: Point2D,
        layers: &[PlacedLayer],
        store: &mut TransformStore,
    ) -> Option<AssetId> {
        if !self.state.is_idle() {
            return None;
        }
        self.flush(store);

        let point = screen.unzoom(self.zoom);
        let selected_hit = self
            .selected
            .as_ref()
            .and_then(|id| layers.iter().find(|l| l.id() == id && l.hit_test(point)));
        let hit = selected_hit.or_else(|| layers.iter().rev().find(|l| l.hit_test(point)));

        let Some(layer) = hit else {
            self.selected = None;
            return None;
        };

        let start_transform = store.get(&layer.asset);
        self.selected = Some(layer.id().clone());
        self.state = ControllerState::Dragging {
            asset: Arc::clone(&layer.asset),
            start_pointer: point,
            start_transform,
        };
        tracing::debug!(id = %layer.id(), x = point.x, y = point.y, "Drag started");
        Some(layer.id().clone())
    }

    /// Start scaling `layer` from a scale handle.
    pub fn begin_scale(&mut self, screen: Point2D, layer: &PlacedLayer, store: &mut TransformStore) {
        self.flush(store);
        let start_scale = store.get(&layer.asset).scale;
        self.selected = Some(layer.id().clone());
        self.state = ControllerState::Scaling {
            asset: Arc::clone(&layer.asset),
            start_pointer: screen.unzoom(self.zoom),
            start_scale,
        };
    }

    /// Pointer moved. Schedules an update for the next tick; returns whether one was scheduled.
    pub fn pointer_move(&mut self, screen: Point2D) -> bool {
        let point = screen.unzoom(self.zoom);
        let (asset, patch) = match &self.state {
            ControllerState::Idle => return false,
            ControllerState::Dragging {
                asset,
                start_pointer,
                start_transform,
            } => {
                let (dx, dy) = point.delta_from(start_pointer);
                (
                    Arc::clone(asset),
                    TransformPatch::position(start_transform.x + dx, start_transform.y + dy),
                )
            }
            ControllerState::Scaling {
                asset,
                start_pointer,
                start_scale,
            } => {
                // Dragging up grows the layer.
                let dy = start_pointer.y - point.y;
                let scale = start_scale + dy * self.limits.drag_scale_sensitivity;
                (
                    Arc::clone(asset),
                    TransformPatch::scale(self.limits.clamp_scale(scale)),
                )
            }
        };
        self.schedule(asset, patch);
        true
    }

    /// Pointer released. The last scheduled move still lands on the next tick.
    pub fn pointer_up(&mut self) {
        if let Some(id) = self.state.target() {
            tracing::debug!(id = %id, "Manipulation finished");
        }
        self.state = ControllerState::Idle;
    }

    /// Abandon the current manipulation (e.g. the preview went away).
    /// Scheduled moves are discarded.
    pub fn cancel(&mut self) {
        self.pending.cancel();
        self.state = ControllerState::Idle;
    }

    /// Wheel over the preview. Only the selected layer scales; `notches`
    /// positive shrinks, negative grows. Returns whether an update was scheduled.
    pub fn wheel(&mut self, notches: f64, layer: &PlacedLayer, store: &mut TransformStore) -> bool {
        if self.selected.as_ref() != Some(layer.id()) || !notches.is_finite() {
            return false;
        }
        if let Some(target) = self.state.target() {
            if target != layer.id() {
                return false;
            }
        }

        // Notches between ticks accumulate on the pending scale.
        let pending_scale = self
            .pending
            .peek()
            .filter(|p| p.asset.id() == layer.id())
            .and_then(|p| p.patch.scale);
        let current = match pending_scale {
            Some(scale) => scale,
            None => store.get(&layer.asset).scale,
        };
        let factor = (1.0 + self.limits.wheel_scale_step).powf(-notches);
        let scale = self.limits.clamp_scale(current * factor);
        self.schedule(Arc::clone(&layer.asset), TransformPatch::scale(scale));
        true
    }

    /// Rotate the selected layer by `steps` rotation increments (negative is
    /// counter-clockwise). Applied immediately.
    pub fn rotate_selected(
        &mut self,
        steps: f64,
        layers: &[PlacedLayer],
        store: &mut TransformStore,
    ) -> Option<PlacementTransform> {
        let id = self.selected.as_ref()?;
        let layer = layers.iter().find(|l| l.id() == id)?;
        let asset = Arc::clone(&layer.asset);
        self.flush(store);

        let rotation = store.get(&asset).rotation + steps * self.limits.rotation_step_deg;
        Some(store.update(&asset, &TransformPatch::rotation(rotation)))
    }

    /// Repaint tick: apply the pending update, if any.
    pub fn tick(&mut self, store: &mut TransformStore) -> Option<PlacementTransform> {
        let pending = self.pending.drain()?;
        Some(store.update(&pending.asset, &pending.patch))
    }

    fn flush(&mut self, store: &mut TransformStore) {
        self.tick(store);
    }

    fn schedule(&mut self, asset: Arc<ImageAsset>, patch: TransformPatch) {
        let patch = match self.pending.peek() {
            Some(p) if p.asset.id() == asset.id() => p.patch.merged(patch),
            _ => patch,
        };
        self.pending.schedule(PendingUpdate { asset, patch });
    }
}
