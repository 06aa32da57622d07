//! wgpu raster backend for the retkit renderer.
//!
//! Implements [`retkit_render::RasterBackend`] on a wgpu device so the same
//! batch, bind cache and program code drive a real GPU. Shaders are WGSL;
//! naga parses and validates them at compile time and supplies the
//! attribute and uniform tables the renderer introspects.
//!
//! # Invariants
//! - Every resource a program uses lives in bind group 0.
//! - Draws load the target; only `clear` discards its contents.
//! - A draw never samples the texture it renders into; the placeholder
//!   texture is bound instead.

mod gpu;
pub mod reflect;
mod shaders;

pub use gpu::{TEXTURE_FORMAT, WgpuBackend};
pub use shaders::{SPRITE_FRAGMENT_WGSL, SPRITE_VERTEX_WGSL};

pub fn crate_info() -> &'static str {
    "retkit-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("wgpu"));
    }
}
