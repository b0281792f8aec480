//! Resize planning: output canvas, source crop, and destination rectangle.

use serde::{Deserialize, Serialize};

use pixbatch_model::geometry::{CanvasSize, PixelRect, Rect};
use pixbatch_model::settings::{ResizeSettings, ResizeTarget};

use crate::fit::{compute_proportional_bounds, compute_resize_fit};

/// Everything the compositor needs to draw one resized image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizePlan {
    /// Output surface size.
    pub canvas: CanvasSize,
    /// Region of the source image that is drawn.
    pub source: PixelRect,
    /// Where `source` lands on the canvas. May extend past it in fill mode.
    pub dest: Rect,
}

/// Plan a resize of a `width x height` image.
///
/// With auto-crop enabled, `opaque_bounds` (from
/// [`detect_opaque_bounds`](crate::autocrop::detect_opaque_bounds)) becomes
/// the source region and the trimmed image is the bounds inflated by the
/// margin. That trimmed image is then sized by the fixed or proportional target.
pub fn plan_resize(
    width: u32,
    height: u32,
    settings: &ResizeSettings,
    opaque_bounds: Option<PixelRect>,
) -> ResizePlan {
    let (source, margin) = match opaque_bounds {
        Some(bounds) if settings.auto_crop.enabled => (clip(bounds, width, height), settings.auto_crop.margin),
        _ => (PixelRect::full(width, height), 0),
    };

    let (trim_w, trim_h) = source.inflated_size(margin);
    let (trim_w, trim_h) = (trim_w.max(1) as f64, trim_h.max(1) as f64);
    let margin = margin as f64;

    let (canvas, origin_x, origin_y, draw_w, draw_h) = match settings.target {
        ResizeTarget::Fixed {
            width: target_w,
            height: target_h,
        } => {
            let canvas = CanvasSize::new(target_w, target_h);
            let (cw, ch) = canvas.as_f64();
            let p = compute_resize_fit(trim_w, trim_h, cw, ch, settings.scale_mode);
            (canvas, p.offset_x, p.offset_y, p.draw_width, p.draw_height)
        }
        ResizeTarget::Proportional {
            bound_size,
            bound_type,
        } => {
            let (out_w, out_h) =
                compute_proportional_bounds(trim_w as u32, trim_h as u32, bound_size, bound_type);
            let canvas = CanvasSize::new(out_w, out_h);
            let (cw, ch) = canvas.as_f64();
            (canvas, 0.0, 0.0, cw, ch)
        }
    };

    let sx = draw_w / trim_w;
    let sy = draw_h / trim_h;
    let dest = Rect::new(
        origin_x + margin * sx,
        origin_y + margin * sy,
        source.width as f64 * sx,
        source.height as f64 * sy,
    );

    tracing::debug!(
        width,
        height,
        canvas_width = canvas.width,
        canvas_height = canvas.height,
        cropped = !source.is_full(width, height),
        "Resize planned"
    );

    ResizePlan {
        canvas,
        source,
        dest,
    }
}

fn clip(bounds: PixelRect, width: u32, height: u32) -> PixelRect {
    if width == 0 || height == 0 {
        return PixelRect::full(width, height);
    }
    let x = bounds.x.min(width.saturating_sub(1));
    let y = bounds.y.min(height.saturating_sub(1));
    PixelRect::new(
        x,
        y,
        bounds.width.clamp(1, width - x),
        bounds.height.clamp(1, height - y),
    )
}
