//! Pixbatch Session
//!
//! Explicit application state for one editing session: which tool is active,
//! the grid, framing, and resize workspaces, and the shared bitmap cache.
//! Hosts hold a [`Session`] and route UI events to it.

pub mod batch;
pub mod framing;
pub mod grid;
pub mod resize;
pub mod session;

pub use batch::{Batch, Navigation};
pub use framing::FramingWorkspace;
pub use grid::GridWorkspace;
pub use resize::ResizeWorkspace;
pub use session::{PreviewInfo, Session};
