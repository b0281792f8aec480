//! Pixbatch Render Engine
//!
//! Paints compositions into raster surfaces and runs batch exports.
//!
//! # Pipeline
//!
//! ```text
//! ImageAsset ──► BitmapCache (decode, premultiply)
//!                     │
//! settings ───────────┼──► compositor ──► Surface ──► PNG bytes
//! layers ─────────────┘                                  │
//!                                        ┌───────────────┤
//!                                        ▼               ▼
//!                                 DeliverySink      zip archive ──► DeliverySink
//! ```
//!
//! Preview and export use the same compositor; only the destination surface
//! differs.

pub mod archive;
pub mod compositor;
pub mod decode;
pub mod delivery;
pub mod export;
pub mod naming;
pub mod surface;

pub use compositor::{canvas_for, render_composition, CompositionInput, RenderReport, SkippedLayer};
pub use decode::{decode_asset, Bitmap, BitmapCache, CachedBitmap, PreloadReport};
pub use delivery::{DeliverySink, DirectorySink, MemorySink};
pub use export::*;
pub use surface::Surface;
