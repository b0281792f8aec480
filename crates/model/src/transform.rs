//! Freeform placement state for framing-mode layers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use pixbatch_common::config::PlacementLimits;

use crate::asset::{AssetId, ImageAsset};
use crate::geometry::{Point2D, Rect};

/// Position, scale, rotation, and visibility of one layer.
///
/// `x`/`y` are the top-left of the unrotated draw box in canvas pixels and may
/// be negative. `rotation` is accumulated degrees; it is never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Default for PlacementTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            visible: true,
        }
    }
}

impl PlacementTransform {
    pub fn new(x: f64, y: f64, scale: f64, rotation: f64) -> Self {
        Self {
            x,
            y,
            scale,
            rotation,
            visible: true,
        }
    }

    /// Merge the fields present in `patch`, leaving the rest untouched.
    /// The resulting scale is clamped into the configured limits.
    pub fn apply(&mut self, patch: &TransformPatch, limits: &PlacementLimits) {
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            self.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            self.y = y;
        }
        if let Some(scale) = patch.scale {
            self.scale = limits.clamp_scale(scale);
        }
        if let Some(rotation) = patch.rotation.filter(|v| v.is_finite()) {
            self.rotation = rotation;
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
    }

    /// Copy with `patch` applied.
    pub fn with(mut self, patch: &TransformPatch, limits: &PlacementLimits) -> Self {
        self.apply(patch, limits);
        self
    }

    /// Unrotated draw box for an image of the given intrinsic size.
    pub fn draw_rect(&self, width: u32, height: u32) -> Rect {
        Rect::new(
            self.x,
            self.y,
            width as f64 * self.scale,
            height as f64 * self.scale,
        )
    }

    /// Rotation reduced into `[0, 360)` for display.
    pub fn normalized_rotation(&self) -> f64 {
        self.rotation.rem_euclid(360.0)
    }
}

/// A partial update to a [`PlacementTransform`]. `None` fields are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale: Option<f64>,
    pub rotation: Option<f64>,
    pub visible: Option<bool>,
}

impl TransformPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn scale(scale: f64) -> Self {
        Self {
            scale: Some(scale),
            ..Self::default()
        }
    }

    pub fn rotation(rotation: f64) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    pub fn visible(visible: bool) -> Self {
        Self {
            visible: Some(visible),
            ..Self::default()
        }
    }

    /// Overlay `newer` on top of this patch; fields set in `newer` win.
    pub fn merged(self, newer: TransformPatch) -> Self {
        Self {
            x: newer.x.or(self.x),
            y: newer.y.or(self.y),
            scale: newer.scale.or(self.scale),
            rotation: newer.rotation.or(self.rotation),
            visible: newer.visible.or(self.visible),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An asset combined with its placement, ready to be drawn or hit-tested.
#[derive(Debug, Clone)]
pub struct PlacedLayer {
    pub asset: Arc<ImageAsset>,
    pub transform: PlacementTransform,
}

impl PlacedLayer {
    pub fn new(asset: Arc<ImageAsset>, transform: PlacementTransform) -> Self {
        Self { asset, transform }
    }

    pub fn id(&self) -> &AssetId {
        self.asset.id()
    }

    /// Unrotated draw box in canvas pixels.
    pub fn draw_rect(&self) -> Rect {
        self.transform
            .draw_rect(self.asset.width(), self.asset.height())
    }

    /// Whether a canvas-space point lands on the (rotated) layer.
    /// Hidden layers never receive hits.
    pub fn hit_test(&self, point: Point2D) -> bool {
        if !self.transform.visible {
            return false;
        }
        let rect = self.draw_rect();
        let (cx, cy) = rect.center();
        let local = point.rotate_around(&Point2D::new(cx, cy), -self.transform.rotation);
        rect.contains(local.x, local.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::test_asset;

    #[test]
    fn test_apply_keeps_untouched_fields() {
        let limits = PlacementLimits::default();
        let mut t = PlacementTransform::new(10.0, 20.0, 0.5, 30.0);
        t.apply(&TransformPatch::position(5.0, 6.0), &limits);
        assert_eq!(t, PlacementTransform::new(5.0, 6.0, 0.5, 30.0));
    }

    #[test]
    fn test_apply_clamps_scale() {
        let limits = PlacementLimits::default();
        let mut t = PlacementTransform::default();
        t.apply(&TransformPatch::scale(0.0), &limits);
        assert_eq!(t.scale, limits.min_scale);
        t.apply(&TransformPatch::scale(99.0), &limits);
        assert_eq!(t.scale, limits.max_scale);
    }

    #[test]
    fn test_apply_ignores_non_finite_position() {
        let limits = PlacementLimits::default();
        let mut t = PlacementTransform::new(1.0, 2.0, 1.0, 0.0);
        t.apply(&TransformPatch::position(f64::NAN, f64::INFINITY), &limits);
        assert_eq!((t.x, t.y), (1.0, 2.0));
    }

    #[test]
    fn test_patch_merge_prefers_newer() {
        let a = TransformPatch::position(1.0, 1.0);
        let b = TransformPatch {
            x: Some(9.0),
            scale: Some(2.0),
            ..TransformPatch::default()
        };
        let merged = a.merged(b);
        assert_eq!(merged.x, Some(9.0));
        assert_eq!(merged.y, Some(1.0));
        assert_eq!(merged.scale, Some(2.0));
    }

    #[test]
    fn test_rotation_is_accumulated_not_wrapped() {
        let limits = PlacementLimits::default();
        let t = PlacementTransform::default().with(&TransformPatch::rotation(375.0), &limits);
        assert_eq!(t.rotation, 375.0);
        assert!((t.normalized_rotation() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test_respects_rotation() {
        // 100x10 bar centered at (50, 5); rotated 90 degrees it becomes 10x100.
        let layer = PlacedLayer::new(
            test_asset("bar", 100, 10),
            PlacementTransform::new(0.0, 0.0, 1.0, 90.0),
        );
        assert!(layer.hit_test(Point2D::new(50.0, 40.0)));
        assert!(!layer.hit_test(Point2D::new(5.0, 5.0)));
    }

    #[test]
    fn test_hidden_layer_is_not_hit() {
        let mut layer = PlacedLayer::new(test_asset("a", 10, 10), PlacementTransform::default());
        layer.transform.visible = false;
        assert!(!layer.hit_test(Point2D::new(5.0, 5.0)));
    }

    proptest::proptest! {
        #[test]
        fn prop_patch_is_idempotent_and_scale_bounded(
            x in -1e4f64..1e4,
            scale in -100.0f64..100.0,
            rotation in -720.0f64..720.0,
        ) {
            let limits = PlacementLimits::default();
            let patch = TransformPatch {
                x: Some(x),
                scale: Some(scale),
                rotation: Some(rotation),
                ..TransformPatch::default()
            };
            let once = PlacementTransform::default().with(&patch, &limits);
            let twice = once.with(&patch, &limits);
            proptest::prop_assert_eq!(once, twice);
            proptest::prop_assert!(once.scale >= limits.min_scale && once.scale <= limits.max_scale);
        }
    }
}
