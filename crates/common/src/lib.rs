//! Shared types for the retkit engine core.
//!
//! Vector math comes from `glam`; this crate only re-exports the primitives
//! the rest of the workspace builds on and adds the few helpers shared between
//! simulation and rendering.

mod types;

pub use glam::{Mat4, Vec2, Vec3};
pub use types::{EntityId, pixel_projection};

pub fn crate_info() -> &'static str {
    "retkit-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
