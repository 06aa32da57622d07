use crate::backend::RasterBackend;
use crate::batch::{Batch, BatchError, quad_indices};
use crate::bind_state::{BindState, BindStats};
use crate::handles::{
    BufferTarget, BufferUsage, FramebufferId, TextureFilter, TextureId, TextureWrap, UniformValue,
};
use crate::image::{ImageSource, Texture};
use crate::program::{self, Program, ProgramError, Uniform, UniformError};

/// An offscreen color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    id: FramebufferId,
    texture: TextureId,
    width: u32,
    height: u32,
}

impl Framebuffer {
    pub fn id(&self) -> FramebufferId {
        self.id
    }

    /// The color texture, sampleable once rendering into it is done.
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Owns a backend and the bind cache in front of it.
///
/// Every texture, framebuffer and program bind goes through [`BindState`],
/// including the binds resource construction needs, so the cache always
/// matches what the backend has bound.
#[derive(Debug)]
pub struct Renderer<B: RasterBackend> {
    backend: B,
    binds: BindState,
    viewport_width: u32,
    viewport_height: u32,
}

impl<B: RasterBackend> Renderer<B> {
    pub fn new(backend: B, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            backend,
            binds: BindState::new(),
            viewport_width,
            viewport_height,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn bind_state(&self) -> &BindState {
        &self.binds
    }

    pub fn bind_stats(&self) -> BindStats {
        self.binds.stats()
    }

    /// Logical size draws are mapped to. Takes effect on the next draw.
    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    /// Source-over blending: `src * a + dst * (1 - a)`.
    pub fn enable_alpha_blending(&mut self) {
        self.backend.enable_alpha_blending();
    }

    /// Clear the bound target.
    pub fn clear(&mut self, color: [f32; 4]) {
        self.backend.clear(color);
    }

    pub fn bind_texture(&mut self, texture: TextureId) {
        if self.binds.bind_texture(texture) {
            self.backend.bind_texture(texture);
        }
    }

    pub fn bind_framebuffer(&mut self, framebuffer: Option<&Framebuffer>) {
        let id = framebuffer.map(Framebuffer::id);
        if self.binds.bind_framebuffer(id) {
            self.backend.bind_framebuffer(id);
        }
    }

    pub fn bind_program(&mut self, program: &Program) {
        if self.binds.bind_program(program.id()) {
            self.backend.use_program(program.id());
        }
    }

    /// Compile, link and introspect a program. Failures are logged, their
    /// backend objects deleted, and returned.
    pub fn build_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Program, ProgramError> {
        program::build(&mut self.backend, vertex_source, fragment_source)
    }

    pub fn delete_program(&mut self, program: Program) {
        self.binds.forget_program(program.id());
        self.backend.delete_program(program.id());
    }

    /// Upload `value` to `uniform` of `program`, after checking it matches
    /// the uniform's declared type.
    pub fn set_program_uniform(
        &mut self,
        program: &Program,
        uniform: Uniform,
        value: impl Into<UniformValue>,
    ) -> Result<(), UniformError> {
        let value = value.into();
        uniform.check(&value)?;
        self.bind_program(program);
        self.backend.set_uniform(uniform.location, &value);
        Ok(())
    }

    /// Name lookup convenience over [`Renderer::set_program_uniform`].
    pub fn set_uniform_by_name(
        &mut self,
        program: &Program,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), UniformError> {
        let uniform = program
            .uniform(name)
            .ok_or_else(|| UniformError::Unknown(name.to_owned()))?;
        self.set_program_uniform(program, uniform, value)
    }

    /// Color-only offscreen target with nearest filtering and clamped edges.
    pub fn build_framebuffer(&mut self, width: u32, height: u32) -> Framebuffer {
        let id = self.backend.create_framebuffer();
        let texture = self.backend.create_texture();
        let framebuffer = Framebuffer {
            id,
            texture,
            width,
            height,
        };

        self.bind_framebuffer(Some(&framebuffer));
        self.bind_texture(texture);
        self.backend.tex_image_2d(width, height, None);
        self.backend
            .texture_parameters(TextureFilter::Nearest, TextureWrap::ClampToEdge);
        self.backend.framebuffer_texture(texture);

        tracing::debug!(framebuffer = id.0, width, height, "framebuffer built");
        framebuffer
    }

    /// Create a texture whose pixels arrive later from `source`.
    pub fn build_texture(&mut self, source: impl ImageSource + Send + 'static) -> Texture {
        let id = self.backend.create_texture();
        Texture::new(id, Box::new(source))
    }

    /// Upload the texture's image if it has become ready. Returns true when
    /// an upload happened.
    pub fn refresh_texture(&mut self, texture: &mut Texture) -> bool {
        if texture.loaded() {
            return false;
        }
        let Some(image) = texture.poll() else {
            return false;
        };

        self.bind_texture(texture.id());
        self.backend
            .tex_image_2d(image.width(), image.height(), Some(image.rgba()));
        self.backend
            .texture_parameters(TextureFilter::Nearest, TextureWrap::ClampToEdge);
        tracing::info!(
            texture = texture.id().0,
            width = image.width(),
            height = image.height(),
            "texture uploaded"
        );
        true
    }

    pub fn delete_texture(&mut self, texture: Texture) {
        self.binds.forget_texture(texture.id());
        self.backend.delete_texture(texture.id());
    }

    /// Allocate vertex storage for `capacity` quads and upload the static
    /// index pattern.
    pub fn build_batch(&mut self, capacity: usize) -> Result<Batch, BatchError> {
        Batch::check_capacity(capacity)?;

        let vertex_buffer = self.backend.create_buffer();
        let element_buffer = self.backend.create_buffer();
        let batch = Batch::new(capacity, vertex_buffer, element_buffer)?;

        let vertex_bytes = vec![0u8; capacity * 4 * crate::batch::BatchVertex::SIZE];
        self.backend.bind_buffer(BufferTarget::Array, vertex_buffer);
        self.backend
            .buffer_data(BufferTarget::Array, &vertex_bytes, BufferUsage::Dynamic);

        let indices = quad_indices(capacity);
        self.backend
            .bind_buffer(BufferTarget::ElementArray, element_buffer);
        self.backend.buffer_data(
            BufferTarget::ElementArray,
            bytemuck::cast_slice(&indices),
            BufferUsage::Static,
        );

        tracing::debug!(capacity, "batch built");
        Ok(batch)
    }

    /// Upload the quads pushed this frame and rewind the batch for the next.
    pub fn flush_batch(&mut self, batch: &mut Batch) {
        let live = batch.vertices();
        if !live.is_empty() {
            self.backend
                .bind_buffer(BufferTarget::Array, batch.vertex_buffer());
            self.backend
                .buffer_sub_data(BufferTarget::Array, 0, bytemuck::cast_slice(live));
        }
        tracing::trace!(quads = batch.pushed_quads(), "batch flushed");
        batch.mark_flushed();
    }

    /// One indexed draw of the last flushed range into `framebuffer`
    /// (`None` for the default target), sampling `texture`.
    pub fn draw_batch(
        &mut self,
        batch: &Batch,
        program: &Program,
        framebuffer: Option<&Framebuffer>,
        texture: TextureId,
    ) {
        self.bind_program(program);
        self.backend
            .viewport(0, 0, self.viewport_width, self.viewport_height);

        self.backend
            .bind_buffer(BufferTarget::Array, batch.vertex_buffer());
        self.backend
            .bind_buffer(BufferTarget::ElementArray, batch.element_buffer());

        let layout = program.vertex_layout();
        for entry in &layout.entries {
            self.backend.enable_vertex_attribute(entry.location);
            self.backend.vertex_attribute_pointer(
                entry.location,
                entry.components,
                layout.stride,
                entry.offset,
            );
        }

        self.bind_framebuffer(framebuffer);
        self.bind_texture(texture);

        self.backend
            .draw_elements((batch.flushed_quads() * 6) as u32, 0);
    }
}
