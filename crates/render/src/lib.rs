//! Rendering: a batched quad renderer over an abstract raster backend.
//!
//! # Invariants
//! - The renderer never mutates world state; it only reads sprites.
//! - Texture, framebuffer and program binds pass through one [`BindState`]
//!   per renderer, so a redundant bind never reaches the backend.
//! - A program that failed to compile or link never becomes a [`Program`].
//! - One flush and one draw per batch per frame.
//!
//! # Workaround
//! [`RecordingBackend`] stands in for a GPU in tests and headless runs. The
//! wgpu implementation lives in `retkit-render-wgpu`.

mod backend;
pub mod batch;
mod bind_state;
mod handles;
mod image;
mod program;
pub mod recording;
mod renderer;

pub use backend::RasterBackend;
pub use batch::{Batch, BatchError, BatchVertex, Quad};
pub use bind_state::{BindCount, BindState, BindStats};
pub use handles::{
    ActiveVariable, BufferId, BufferTarget, BufferUsage, FramebufferId, ProgramId, ShaderId,
    ShaderStage, TextureFilter, TextureId, TextureWrap, UniformLocation, UniformValue,
    VariableType,
};
pub use image::{ImageData, ImageError, ImageSource, Texture};
pub use program::{
    Attribute, LayoutEntry, Program, ProgramError, Uniform, UniformError, VertexAttribute,
    VertexLayout,
};
pub use recording::{BackendCall, RecordingBackend};
pub use renderer::{Framebuffer, Renderer};

pub fn crate_info() -> &'static str {
    "retkit-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
