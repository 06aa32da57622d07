//! Game layer: configuration and the testbed scene.
//!
//! # Invariants
//! - Scene motion depends only on simulation time and input, never on
//!   host frame timing.
//! - Each render pushes every world sprite, flushes once and draws once.
//! - Sprites that do not fit the batch are dropped for that frame and
//!   counted, never drawn from a second batch.

pub mod config;
pub mod scene;
pub mod shaders;
mod testbed;

pub use config::{ConfigError, GameConfig};
pub use shaders::{SPRITE_FRAGMENT_GLSL, SPRITE_VERTEX_GLSL};
pub use testbed::{CLEAR_COLOR, ShaderSources, Testbed, TestbedError, TestbedStats};

/// GLSL sources for the sprite program.
pub fn glsl_shaders() -> ShaderSources<'static> {
    ShaderSources {
        vertex: SPRITE_VERTEX_GLSL,
        fragment: SPRITE_FRAGMENT_GLSL,
    }
}

pub fn crate_info() -> &'static str {
    "retkit-game v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("game"));
    }
}
