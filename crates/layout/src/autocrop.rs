//! Opaque-bounds detection for auto-crop.
//!
//! This is a full scan of the alpha channel. Run it once per navigation or
//! export item, never per frame.

use pixbatch_model::geometry::PixelRect;

/// Tightest rectangle around every pixel with alpha > 0.
///
/// `pixels` is tightly packed RGBA8, row-major. A fully transparent image (or
/// a buffer too short to hold any pixel) reports the full canvas, meaning no
/// crop is needed.
pub fn detect_opaque_bounds(pixels: &[u8], width: u32, height: u32) -> PixelRect {
    let full = PixelRect::full(width, height);
    if width == 0 || height == 0 {
        return full;
    }

    let stride = width as usize * 4;
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (y, row) in pixels.chunks_exact(stride).take(height as usize).enumerate() {
        let y = y as u32;
        let mut row_first = None;
        let mut row_last = 0u32;
        for (x, px) in row.chunks_exact(4).enumerate() {
            if px[3] > 0 {
                let x = x as u32;
                if row_first.is_none() {
                    row_first = Some(x);
                }
                row_last = x;
            }
        }
        if let Some(first) = row_first {
            found = true;
            min_x = min_x.min(first);
            max_x = max_x.max(row_last);
            min_y = min_y.min(y);
            max_y = y;
        }
    }

    if !found {
        return full;
    }

    PixelRect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

/// Output canvas for an auto-cropped image: bounds inflated by `margin` on all sides.
pub fn auto_crop_canvas(bounds: &PixelRect, margin: u32) -> (u32, u32) {
    bounds.inflated_size(margin)
}
