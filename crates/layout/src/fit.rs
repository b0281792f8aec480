//! Aspect-ratio fitting math.

use serde::{Deserialize, Serialize};

use pixbatch_model::geometry::Rect;
use pixbatch_model::settings::{BoundType, ScaleMode};

/// A draw size plus its offset inside a containing box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub draw_width: f64,
    pub draw_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Placement {
    /// Absolute draw rectangle for a box whose top-left is `(origin_x, origin_y)`.
    pub fn rect_at(&self, origin_x: f64, origin_y: f64) -> Rect {
        Rect::new(
            origin_x + self.offset_x,
            origin_y + self.offset_y,
            self.draw_width,
            self.draw_height,
        )
    }

    fn empty() -> Self {
        Self::default()
    }
}

/// Contain-fit an image of the given aspect ratio into a grid cell.
///
/// The result never exceeds the cell on either axis and is centered on the
/// axis with slack. Degenerate inputs produce an empty placement.
pub fn place_image_in_cell(aspect_ratio: f64, cell_width: f64, cell_height: f64) -> Placement {
    if !(aspect_ratio.is_finite() && aspect_ratio > 0.0)
        || !(cell_width.is_finite() && cell_width > 0.0)
        || !(cell_height.is_finite() && cell_height > 0.0)
    {
        return Placement::empty();
    }

    let mut draw_width = cell_width;
    let mut draw_height = cell_width / aspect_ratio;
    if draw_height > cell_height {
        draw_height = cell_height;
        draw_width = (cell_height * aspect_ratio).min(cell_width);
    }

    Placement {
        draw_width,
        draw_height,
        offset_x: ((cell_width - draw_width) / 2.0).max(0.0),
        offset_y: ((cell_height - draw_height) / 2.0).max(0.0),
    }
}

/// Scale an image into a fixed target rectangle.
///
/// `Fill` overflows the target on one axis; the caller clips to the canvas.
pub fn compute_resize_fit(
    image_width: f64,
    image_height: f64,
    target_width: f64,
    target_height: f64,
    mode: ScaleMode,
) -> Placement {
    if !(image_width > 0.0 && image_height > 0.0 && target_width > 0.0 && target_height > 0.0) {
        return Placement::empty();
    }

    let ratio = match mode {
        ScaleMode::Stretch => {
            return Placement {
                draw_width: target_width,
                draw_height: target_height,
                offset_x: 0.0,
                offset_y: 0.0,
            };
        }
        ScaleMode::Fit => (target_width / image_width).min(target_height / image_height),
        ScaleMode::Fill => (target_width / image_width).max(target_height / image_height),
    };

    let draw_width = image_width * ratio;
    let draw_height = image_height * ratio;
    Placement {
        draw_width,
        draw_height,
        offset_x: (target_width - draw_width) / 2.0,
        offset_y: (target_height - draw_height) / 2.0,
    }
}

/// Cover semantics for background images: fill the canvas, centered.
pub fn cover(image_width: f64, image_height: f64, canvas_width: f64, canvas_height: f64) -> Placement {
    compute_resize_fit(
        image_width,
        image_height,
        canvas_width,
        canvas_height,
        ScaleMode::Fill,
    )
}

/// Output size that constrains the longer (`Max`) or shorter (`Min`) edge to
/// `bound_size`, preserving aspect ratio. The constrained edge is exact; the
/// other edge is rounded and never below one pixel.
pub fn compute_proportional_bounds(
    width: u32,
    height: u32,
    bound_size: u32,
    bound_type: BoundType,
) -> (u32, u32) {
    let bound = bound_size.max(1);
    if width == 0 || height == 0 {
        return (bound, bound);
    }

    let wider_than_tall = width >= height;
    let scale_other = |other: u32, constrained: u32| -> u32 {
        let value = (other as f64 * bound as f64 / constrained as f64).round();
        (value.min(u32::MAX as f64) as u32).max(1)
    };

    // Which edge is pinned to the bound: the long one for Max, the short one for Min.
    let pin_width = match bound_type {
        BoundType::Max => wider_than_tall,
        BoundType::Min => !wider_than_tall,
    };

    if pin_width {
        (bound, scale_other(height, width))
    } else {
        (scale_other(width, height), bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contain_wide_image_in_square_cell() {
        let p = place_image_in_cell(2.0, 100.0, 100.0);
        assert_eq!(p.draw_width, 100.0);
        assert_eq!(p.draw_height, 50.0);
        assert_eq!(p.offset_x, 0.0);
        assert_eq!(p.offset_y, 25.0);
    }

    #[test]
    fn test_contain_tall_image_in_square_cell() {
        let p = place_image_in_cell(0.5, 100.0, 100.0);
        assert_eq!(p.draw_width, 50.0);
        assert_eq!(p.draw_height, 100.0);
        assert_eq!(p.offset_x, 25.0);
        assert_eq!(p.offset_y, 0.0);
    }

    #[test]
    fn test_contain_degenerate_cell_is_empty() {
        assert_eq!(place_image_in_cell(1.0, 0.0, 10.0), Placement::default());
        assert_eq!(place_image_in_cell(f64::NAN, 10.0, 10.0), Placement::default());
    }

    #[test]
    fn test_fill_overflows_one_axis() {
        let p = compute_resize_fit(1920.0, 1080.0, 1080.0, 1080.0, ScaleMode::Fill);
        assert!((p.draw_height - 1080.0).abs() < 1e-9);
        assert!((p.draw_width - 1920.0).abs() < 1e-9);
        assert!((p.offset_x + 420.0).abs() < 1e-9);
        assert_eq!(p.offset_y, 0.0);
    }

    #[test]
    fn test_stretch_ignores_aspect() {
        let p = compute_resize_fit(1920.0, 1080.0, 300.0, 500.0, ScaleMode::Stretch);
        assert_eq!(
            p,
            Placement {
                draw_width: 300.0,
                draw_height: 500.0,
                offset_x: 0.0,
                offset_y: 0.0
            }
        );
    }

    #[test]
    fn test_proportional_max_and_min() {
        assert_eq!(compute_proportional_bounds(4000, 3000, 1000, BoundType::Max), (1000, 750));
        assert_eq!(compute_proportional_bounds(3000, 4000, 1000, BoundType::Max), (750, 1000));
        assert_eq!(compute_proportional_bounds(4000, 3000, 1000, BoundType::Min), (1333, 1000));
        assert_eq!(compute_proportional_bounds(3000, 4000, 1000, BoundType::Min), (1000, 1333));
    }

    #[test]
    fn test_proportional_never_collapses_to_zero() {
        assert_eq!(compute_proportional_bounds(10_000, 1, 100, BoundType::Max), (100, 1));
    }

    #[test]
    fn test_rect_at_applies_offset() {
        let p = place_image_in_cell(2.0, 100.0, 100.0);
        assert_eq!(p.rect_at(10.0, 20.0), Rect::new(10.0, 45.0, 100.0, 50.0));
    }
}
