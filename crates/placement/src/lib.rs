//! Pixbatch Placement
//!
//! Freeform layer placement for the framing tool:
//! - [`TransformStore`]: lazily defaulted per-item transforms
//! - [`ManipulationController`]: pointer state machine (drag, scale, rotate)
//!   with frame-coalesced updates

pub mod controller;
pub mod store;

pub use controller::{ControllerState, ManipulationController, PendingUpdate};
pub use store::TransformStore;
