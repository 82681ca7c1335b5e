//! Data models for the studio backend.
//!
//! Field names serialize as camelCase to match the frontend.

mod artifact;
mod message;
mod version;

pub use artifact::*;
pub use message::*;
pub use version::*;
