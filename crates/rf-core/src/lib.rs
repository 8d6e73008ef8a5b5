//! rf-core: shared types, IDs, errors, and configuration for reelfeed.
//!
//! Every other rf-* crate depends on this one for type-safe identifiers,
//! the unified error type, the immutable feed record model, and the
//! JSON configuration tree.

pub mod config;
pub mod error;
pub mod ids;
pub mod video;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use video::*;
