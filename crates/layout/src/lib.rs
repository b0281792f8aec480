//! Pixbatch Layout: the geometry solver
//!
//! Converts source image dimensions plus declarative settings into draw
//! rectangles on a fixed-size canvas:
//! - **Grid:** Manual and auto-flow column/row solving
//! - **Fit:** Contain, fit, fill, and stretch scaling math
//! - **Bounds:** Proportional long/short edge sizing
//! - **Auto-crop:** Tightest box around non-transparent pixels
//! - **Placement:** Default freeform transforms for framing layers
//!
//! This crate is pure computation with no I/O and no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod autocrop;
pub mod fit;
pub mod grid;
pub mod placement;
pub mod resize;

pub use autocrop::{auto_crop_canvas, detect_opaque_bounds};
pub use fit::{
    compute_proportional_bounds, compute_resize_fit, cover, place_image_in_cell, Placement,
};
pub use grid::{compute_grid_layout, GridLayout};
pub use placement::{default_transform, extra_layer_transform};
pub use resize::{plan_resize, ResizePlan};
