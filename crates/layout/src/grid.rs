//! Grid tiling: column/row solving and cell rectangles.
//!
//! Manual mode keeps the canvas fixed and shrinks cells to fit it. Auto-flow
//! derives the column count from the images' average aspect ratio and grows
//! the canvas to fit the resulting square cells.

use serde::{Deserialize, Serialize};

use pixbatch_model::geometry::{CanvasSize, Rect};
use pixbatch_model::settings::GridSettings;

/// Solved grid geometry in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub cols: u32,
    /// `ceil(count / cols)`; zero for an empty set.
    pub rows: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub margin: f64,
    pub spacing: f64,
}

impl GridLayout {
    /// Cell rectangle for the item at `index` (row-major).
    pub fn cell_rect(&self, index: usize) -> Rect {
        let cols = self.cols.max(1) as usize;
        let col = (index % cols) as f64;
        let row = (index / cols) as f64;
        Rect::new(
            self.margin + col * (self.cell_width + self.spacing),
            self.margin + row * (self.cell_height + self.spacing),
            self.cell_width,
            self.cell_height,
        )
    }

    /// `(row, col)` of the item at `index`.
    pub fn cell_of(&self, index: usize) -> (u32, u32) {
        let cols = self.cols.max(1) as usize;
        ((index / cols) as u32, (index % cols) as u32)
    }

    /// Canvas rounded to whole pixels.
    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize::from_f64(self.canvas_width, self.canvas_height)
    }
}

/// Solve the grid for the active images' aspect ratios, in set order.
pub fn compute_grid_layout(settings: &GridSettings, aspect_ratios: &[f64]) -> GridLayout {
    let margin = sanitize_gap(settings.outer_margin);
    let spacing = sanitize_gap(settings.inner_spacing);
    let canvas = settings.nominal_canvas();
    let (canvas_width, canvas_height) = canvas.as_f64();
    let count = aspect_ratios.len() as u32;

    if settings.is_auto_flow() && count > 0 {
        let valid: Vec<f64> = aspect_ratios
            .iter()
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .collect();
        let avg = if valid.is_empty() {
            1.0
        } else {
            valid.iter().sum::<f64>() / valid.len() as f64
        };

        let target = settings.target_shape.target_ratio();
        let cols = ((target * count as f64 / avg).sqrt().round() as u32).max(1);
        let rows = count.div_ceil(cols);

        let base = span(canvas_width, margin, spacing, cols);
        let scale = 1.0 + settings.item_scale / 100.0;
        let cell = (base * scale).max(0.0);

        let layout = GridLayout {
            cols,
            rows,
            cell_width: cell,
            cell_height: cell,
            canvas_width: extent(cell, margin, spacing, cols),
            canvas_height: extent(cell, margin, spacing, rows),
            margin,
            spacing,
        };
        tracing::debug!(
            count,
            cols,
            rows,
            cell,
            canvas_width = layout.canvas_width,
            canvas_height = layout.canvas_height,
            "Auto-flow grid solved"
        );
        return layout;
    }

    let cols = settings.columns.max(1);
    let rows = count.div_ceil(cols);

    GridLayout {
        cols,
        rows,
        cell_width: span(canvas_width, margin, spacing, cols),
        cell_height: span(canvas_height, margin, spacing, rows.max(1)),
        canvas_width,
        canvas_height,
        margin,
        spacing,
    }
}

/// Size of one of `n` cells sharing `total` pixels.
fn span(total: f64, margin: f64, spacing: f64, n: u32) -> f64 {
    let n = n.max(1) as f64;
    ((total - 2.0 * margin - (n - 1.0) * spacing) / n).max(0.0)
}

/// Total extent of `n` cells of size `cell`.
fn extent(cell: f64, margin: f64, spacing: f64, n: u32) -> f64 {
    let n = n as f64;
    n * cell + 2.0 * margin + (n - 1.0).max(0.0) * spacing
}

fn sanitize_gap(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixbatch_model::settings::{GridLayoutMode, TargetShape};

    fn manual(columns: u32, margin: f64, spacing: f64) -> GridSettings {
        GridSettings {
            columns,
            outer_margin: margin,
            inner_spacing: spacing,
            ..GridSettings::default()
        }
    }

    #[test]
    fn test_manual_cells_fill_fixed_canvas() {
        let layout = compute_grid_layout(&manual(2, 10.0, 4.0), &[1.0, 1.0, 1.0]);
        assert_eq!(layout.cols, 2);
        assert_eq!(layout.rows, 2);
        assert!((layout.cell_width - (2048.0 - 20.0 - 4.0) / 2.0).abs() < 1e-9);
        assert_eq!(layout.canvas_width, 2048.0);

        let last = layout.cell_rect(3);
        assert!((last.right() - (2048.0 - 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_columns_clamped_to_one() {
        let layout = compute_grid_layout(&manual(0, 0.0, 0.0), &[1.0, 1.0]);
        assert_eq!(layout.cols, 1);
        assert_eq!(layout.rows, 2);
        assert!(layout.cell_width.is_finite());
    }

    #[test]
    fn test_empty_manual_grid_is_drawable() {
        let layout = compute_grid_layout(&manual(3, 5.0, 5.0), &[]);
        assert_eq!(layout.rows, 0);
        assert!(layout.cell_height.is_finite());
        assert_eq!(layout.canvas_size(), CanvasSize::new(2048, 2048));
    }

    #[test]
    fn test_auto_flow_empty_reverts_to_nominal_canvas() {
        let settings = GridSettings {
            layout_mode: GridLayoutMode::AutoFlow,
            canvas_width: 1000,
            canvas_height: 700,
            ..GridSettings::default()
        };
        let layout = compute_grid_layout(&settings, &[]);
        assert_eq!(layout.canvas_size(), CanvasSize::new(1000, 700));
    }

    #[test]
    fn test_auto_flow_landscape_prefers_more_columns() {
        let base = GridSettings {
            layout_mode: GridLayoutMode::AutoFlow,
            ..GridSettings::default()
        };
        let ratios = [1.0; 12];
        let square = compute_grid_layout(&base, &ratios);
        let wide = compute_grid_layout(
            &GridSettings {
                target_shape: TargetShape::Landscape,
                ..base.clone()
            },
            &ratios,
        );
        assert!(wide.cols > square.cols);
    }

    #[test]
    fn test_item_scale_shrinks_cells() {
        let base = GridSettings {
            layout_mode: GridLayoutMode::AutoFlow,
            ..GridSettings::default()
        };
        let normal = compute_grid_layout(&base, &[1.0, 1.0, 1.0, 1.0]);
        let shrunk = compute_grid_layout(
            &GridSettings {
                item_scale: -50.0,
                ..base
            },
            &[1.0, 1.0, 1.0, 1.0],
        );
        assert!((shrunk.cell_width - normal.cell_width * 0.5).abs() < 1e-9);
        assert!(shrunk.canvas_width < normal.canvas_width);
    }

    #[test]
    fn test_cell_of_is_row_major() {
        let layout = compute_grid_layout(&manual(3, 0.0, 0.0), &[1.0; 7]);
        assert_eq!(layout.cell_of(0), (0, 0));
        assert_eq!(layout.cell_of(2), (0, 2));
        assert_eq!(layout.cell_of(3), (1, 0));
        assert_eq!(layout.cell_of(6), (2, 0));
    }
}
