//! Per-item placement state keyed by asset id.

use std::collections::{HashMap, HashSet};

use pixbatch_common::config::PlacementLimits;
use pixbatch_layout::placement::default_transform;
use pixbatch_model::asset::{AssetId, ImageAsset};
use pixbatch_model::geometry::CanvasSize;
use pixbatch_model::transform::{PlacementTransform, TransformPatch};

/// Placement transforms for framing layers.
///
/// Transforms are created lazily on first access, seeded with a centered
/// default derived from the current canvas and the image size. They persist
/// across batch navigation until the owning item is removed. Pointer-driven
/// and direct edits both go through [`TransformStore::update`].
///
/// A cached default is not a saved placement: only `update` and `seed` mark
/// an entry as saved, and only saved entries win over an export fallback.
#[derive(Debug, Clone)]
pub struct TransformStore {
    transforms: HashMap<AssetId, PlacementTransform>,
    saved: HashSet<AssetId>,
    canvas: CanvasSize,
    limits: PlacementLimits,
}

impl TransformStore {
    pub fn new(canvas: CanvasSize, limits: PlacementLimits) -> Self {
        Self {
            transforms: HashMap::new(),
            saved: HashSet::new(),
            canvas,
            limits,
        }
    }

    /// Stored transform, or the default for this asset (cached on first access).
    pub fn get(&mut self, asset: &ImageAsset) -> PlacementTransform {
        let canvas = self.canvas;
        let limits = &self.limits;
        *self
            .transforms
            .entry(asset.id().clone())
            .or_insert_with(|| default_transform(asset.width(), asset.height(), canvas, limits))
    }

    /// Stored transform without defaulting.
    pub fn peek(&self, id: &AssetId) -> Option<&PlacementTransform> {
        self.transforms.get(id)
    }

    /// Transform saved by an edit or seed. Cached defaults are not returned.
    pub fn saved(&self, id: &AssetId) -> Option<&PlacementTransform> {
        if self.saved.contains(id) {
            self.transforms.get(id)
        } else {
            None
        }
    }

    /// What `get` would return, without caching anything.
    pub fn resolve(&self, asset: &ImageAsset) -> PlacementTransform {
        self.transforms.get(asset.id()).copied().unwrap_or_else(|| {
            default_transform(asset.width(), asset.height(), self.canvas, &self.limits)
        })
    }

    /// Merge `patch` into the stored (or freshly defaulted) transform.
    pub fn update(&mut self, asset: &ImageAsset, patch: &TransformPatch) -> PlacementTransform {
        let mut transform = self.get(asset);
        transform.apply(patch, &self.limits);
        self.transforms.insert(asset.id().clone(), transform);
        self.saved.insert(asset.id().clone());
        tracing::trace!(id = %asset.id(), ?patch, "Transform updated");
        transform
    }

    /// Store an explicit transform, replacing any previous one.
    pub fn seed(&mut self, id: AssetId, mut transform: PlacementTransform) {
        transform.scale = self.limits.clamp_scale(transform.scale);
        self.saved.insert(id.clone());
        self.transforms.insert(id, transform);
    }

    pub fn remove(&mut self, id: &AssetId) -> Option<PlacementTransform> {
        self.saved.remove(id);
        self.transforms.remove(id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.transforms.contains_key(id)
    }

    /// Transform for an export item: its own if saved, otherwise `fallback`.
    pub fn resolve_or(&self, id: &AssetId, fallback: &PlacementTransform) -> PlacementTransform {
        self.saved(id).copied().unwrap_or(*fallback)
    }

    /// Change the canvas used for future defaults. Existing transforms are kept.
    pub fn set_canvas(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn limits(&self) -> &PlacementLimits {
        &self.limits
    }

    pub fn clear(&mut self) {
        self.transforms.clear();
        self.saved.clear();
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}
