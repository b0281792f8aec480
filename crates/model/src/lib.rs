//! Pixbatch Model
//!
//! Defines the core data contracts for Pixbatch compositions:
//! - **Assets:** Immutable source images with fixed intrinsic dimensions
//! - **Active sets:** Ordered, toggleable selections of assets
//! - **Transforms:** Freeform per-layer position, scale, rotation, visibility
//! - **Settings:** Grid, framing, and resize parameters
//!
//! All geometry is expressed in full-resolution canvas pixels. Preview zoom
//! is applied only at the pointer boundary and when presenting a preview.

pub mod asset;
pub mod color;
pub mod geometry;
pub mod settings;
pub mod transform;

pub use asset::*;
pub use color::*;
pub use geometry::*;
pub use settings::*;
pub use transform::*;
