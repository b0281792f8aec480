//! Pixbatch Common Utilities
//!
//! Shared infrastructure for all Pixbatch crates:
//! - Error types and result aliases
//! - Engine configuration
//! - Frame-coalescing primitives for pointer input
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod frame;
pub mod logging;

pub use config::*;
pub use error::*;
pub use frame::*;
