use proptest::prelude::*;

use pixbatch_layout::{
    compute_grid_layout, compute_proportional_bounds, detect_opaque_bounds, place_image_in_cell,
};
use pixbatch_model::geometry::PixelRect;
use pixbatch_model::settings::{BoundType, GridLayoutMode, GridSettings, TargetShape};

const EPS: f64 = 1e-6;

fn target_shape() -> impl Strategy<Value = TargetShape> {
    prop_oneof![
        Just(TargetShape::Square),
        Just(TargetShape::Portrait),
        Just(TargetShape::Landscape),
    ]
}

proptest! {
    #[test]
    fn contain_fit_never_overflows(
        aspect in 0.01f64..100.0,
        cell_w in 1.0f64..5000.0,
        cell_h in 1.0f64..5000.0,
    ) {
        let p = place_image_in_cell(aspect, cell_w, cell_h);
        prop_assert!(p.draw_width <= cell_w + EPS);
        prop_assert!(p.draw_height <= cell_h + EPS);
        prop_assert!(p.offset_x >= 0.0);
        prop_assert!(p.offset_y >= 0.0);
    }

    #[test]
    fn manual_grid_assigns_unique_cells(count in 0usize..60, columns in 1u32..12) {
        let settings = GridSettings { columns, ..GridSettings::default() };
        let layout = compute_grid_layout(&settings, &vec![1.0; count]);

        prop_assert_eq!(layout.rows as usize, count.div_ceil(columns as usize));

        let mut seen = std::collections::HashSet::new();
        for index in 0..count {
            let (row, col) = layout.cell_of(index);
            prop_assert_eq!(col as usize, index % columns as usize);
            prop_assert_eq!(row as usize, index / columns as usize);
            prop_assert!(seen.insert((row, col)));
        }
    }

    #[test]
    fn auto_flow_canvas_matches_content(
        ratios in prop::collection::vec(0.2f64..5.0, 1..40),
        margin in 0.0f64..50.0,
        spacing in 0.0f64..50.0,
        shape in target_shape(),
    ) {
        let settings = GridSettings {
            layout_mode: GridLayoutMode::AutoFlow,
            outer_margin: margin,
            inner_spacing: spacing,
            item_scale: 0.0,
            target_shape: shape,
            ..GridSettings::default()
        };
        let l = compute_grid_layout(&settings, &ratios);
        let cols = l.cols as f64;
        let rows = l.rows as f64;

        prop_assert!(l.cols >= 1);
        prop_assert_eq!(l.cell_width, l.cell_height);
        let expected_w = cols * l.cell_width + 2.0 * margin + (cols - 1.0) * spacing;
        let expected_h = rows * l.cell_height + 2.0 * margin + (rows - 1.0) * spacing;
        prop_assert!((l.canvas_width - expected_w).abs() < EPS);
        prop_assert!((l.canvas_height - expected_h).abs() < EPS);
    }

    #[test]
    fn proportional_max_bound(w in 1u32..10_000, h in 1u32..10_000, bound in 1u32..4000) {
        let (ow, oh) = compute_proportional_bounds(w, h, bound, BoundType::Max);
        prop_assert_eq!(ow.max(oh), bound);
        prop_assert!(ow.min(oh) <= bound);
    }

    #[test]
    fn proportional_min_bound(w in 1u32..10_000, h in 1u32..10_000, bound in 1u32..4000) {
        let (ow, oh) = compute_proportional_bounds(w, h, bound, BoundType::Min);
        prop_assert_eq!(ow.min(oh), bound);
        prop_assert!(ow.max(oh) >= bound);
    }

    #[test]
    fn opaque_block_is_recovered(
        w in 1u32..48,
        h in 1u32..48,
        seed in any::<(u32, u32, u32, u32)>(),
    ) {
        let x = seed.0 % w;
        let y = seed.1 % h;
        let bw = 1 + seed.2 % (w - x);
        let bh = 1 + seed.3 % (h - y);

        let mut pixels = vec![0u8; (w * h * 4) as usize];
        for py in y..y + bh {
            for px in x..x + bw {
                pixels[((py * w + px) * 4 + 3) as usize] = 255;
            }
        }
        prop_assert_eq!(detect_opaque_bounds(&pixels, w, h), PixelRect::new(x, y, bw, bh));
    }
}
