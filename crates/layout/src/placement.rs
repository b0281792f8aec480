//! Default freeform placements for framing layers.

use pixbatch_common::config::PlacementLimits;
use pixbatch_model::geometry::CanvasSize;
use pixbatch_model::transform::PlacementTransform;

/// Centered default for a main-subject layer.
///
/// The image's long edge covers `default_long_edge_ratio` of the canvas long
/// edge. Deterministic for a given canvas and image size.
pub fn default_transform(
    image_width: u32,
    image_height: u32,
    canvas: CanvasSize,
    limits: &PlacementLimits,
) -> PlacementTransform {
    let (cw, ch) = canvas.as_f64();
    let image_long = image_width.max(image_height).max(1) as f64;
    let scale = limits.clamp_scale(limits.default_long_edge_ratio * cw.max(ch) / image_long);

    let draw_w = image_width as f64 * scale;
    let draw_h = image_height as f64 * scale;
    PlacementTransform::new((cw - draw_w) / 2.0, (ch - draw_h) / 2.0, scale, 0.0)
}

/// Fixed default for a newly added extra layer.
pub fn extra_layer_transform(limits: &PlacementLimits) -> PlacementTransform {
    let (x, y) = limits.extra_layer_origin;
    PlacementTransform::new(x, y, limits.clamp_scale(limits.extra_layer_scale), 0.0)
}
