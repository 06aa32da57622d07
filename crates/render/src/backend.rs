use crate::handles::{
    ActiveVariable, BufferId, BufferTarget, BufferUsage, FramebufferId, ProgramId, ShaderId,
    ShaderStage, TextureFilter, TextureId, TextureWrap, UniformLocation, UniformValue,
};

/// The raster API the renderer drives.
///
/// Shaped after a bind-to-edit immediate-mode API: texture uploads and
/// parameters apply to the bound texture, buffer uploads to the buffer bound
/// on that target, uniforms to the program in use. Implementations never
/// cache binds themselves; redundant-bind elision is the renderer's job.
///
/// Object creation does not fail. A backend that cannot create an object
/// returns an id that later calls treat as a no-op.
pub trait RasterBackend {
    // Shaders and programs.
    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> ShaderId;
    /// Returns the compile status.
    fn compile_shader(&mut self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&mut self, shader: ShaderId);

    fn create_program(&mut self) -> ProgramId;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    /// Returns the link status.
    fn link_program(&mut self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&mut self, program: ProgramId);
    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveVariable>;
    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveVariable>;

    fn use_program(&mut self, program: ProgramId);
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    // Textures.
    fn create_texture(&mut self) -> TextureId;
    fn delete_texture(&mut self, texture: TextureId);
    fn bind_texture(&mut self, texture: TextureId);
    /// (Re)allocate the bound texture as RGBA8. `None` leaves the contents
    /// undefined.
    fn tex_image_2d(&mut self, width: u32, height: u32, rgba: Option<&[u8]>);
    fn texture_parameters(&mut self, filter: TextureFilter, wrap: TextureWrap);

    // Render targets. `None` is the default target.
    fn create_framebuffer(&mut self) -> FramebufferId;
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);
    /// Attach a texture as the bound framebuffer's color target.
    fn framebuffer_texture(&mut self, texture: TextureId);

    // Buffers and vertex layout.
    fn create_buffer(&mut self) -> BufferId;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId);
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);
    fn enable_vertex_attribute(&mut self, location: u32);
    /// Float attribute of `components` at byte `offset` within `stride`.
    fn vertex_attribute_pointer(
        &mut self,
        location: u32,
        components: u32,
        stride: u32,
        offset: u32,
    );

    // Output.
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn enable_alpha_blending(&mut self);
    fn clear(&mut self, color: [f32; 4]);
    /// Indexed triangle list over 16-bit indices starting at byte `offset`.
    fn draw_elements(&mut self, count: u32, offset: u32);
}
