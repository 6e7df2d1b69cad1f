//! cf-core: Shared types for CueForge
//!
//! Leaf crate used by every other CueForge crate:
//! - Decibel / gain / pitch conversions and the mix ranges they clamp to
//! - 3D positions for emitters and the listener

mod level;
mod position;

pub use level::*;
pub use position::*;
