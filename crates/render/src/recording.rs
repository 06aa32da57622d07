//! Headless backend that records every call.
//!
//! Objects get sequential ids starting at 1. Shader sources are scanned for
//! GLSL `attribute` and `uniform` declarations to answer introspection
//! queries; a source without a `main(` entry fails to compile, and a program
//! fails to link if a stage is missing or failed, or if [`RecordingBackend::fail_links`]
//! was set.

use std::collections::BTreeMap;

use crate::backend::RasterBackend;
use crate::handles::{
    ActiveVariable, BufferId, BufferTarget, BufferUsage, FramebufferId, ProgramId, ShaderId,
    ShaderStage, TextureFilter, TextureId, TextureWrap, UniformLocation, UniformValue,
    VariableType,
};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateShader(ShaderId, ShaderStage),
    CompileShader(ShaderId, bool),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId, bool),
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    SetUniform(UniformLocation, UniformValue),
    CreateTexture(TextureId),
    DeleteTexture(TextureId),
    BindTexture(TextureId),
    TexImage2D {
        width: u32,
        height: u32,
        with_data: bool,
    },
    TextureParameters(TextureFilter, TextureWrap),
    CreateFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    FramebufferTexture(TextureId),
    CreateBuffer(BufferId),
    BindBuffer(BufferTarget, BufferId),
    BufferData {
        target: BufferTarget,
        len: usize,
        usage: BufferUsage,
    },
    BufferSubData {
        target: BufferTarget,
        offset: usize,
        len: usize,
    },
    EnableVertexAttribute(u32),
    VertexAttributePointer {
        location: u32,
        components: u32,
        stride: u32,
        offset: u32,
    },
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    EnableAlphaBlending,
    Clear([f32; 4]),
    DrawElements {
        count: u32,
        offset: u32,
    },
}

#[derive(Debug, Clone)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: Option<bool>,
}

#[derive(Debug, Clone, Default)]
struct ProgramRecord {
    shaders: Vec<ShaderId>,
    linked: bool,
    log: String,
    uniforms: Vec<ActiveVariable>,
    attributes: Vec<ActiveVariable>,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    next_id: u32,
    shaders: BTreeMap<ShaderId, ShaderRecord>,
    programs: BTreeMap<ProgramId, ProgramRecord>,
    buffers: BTreeMap<BufferId, Vec<u8>>,
    bound_buffers: BTreeMap<BufferTarget, BufferId>,
    fail_links: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent link fail.
    pub fn fail_links(&mut self, fail: bool) {
        self.fail_links = fail;
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn draw_calls(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::DrawElements { .. }))
    }

    /// Current contents of a buffer as last uploaded.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// `(qualifier, type, name)` for each `attribute`/`uniform` line, in order.
fn declarations(source: &str) -> impl Iterator<Item = (&str, VariableType, &str)> {
    source.lines().filter_map(|line| {
        let mut words = line.split_whitespace();
        let qualifier = words.next()?;
        if qualifier != "attribute" && qualifier != "uniform" {
            return None;
        }
        let mut ty = words.next()?;
        // Skip a precision qualifier.
        if matches!(ty, "lowp" | "mediump" | "highp") {
            ty = words.next()?;
        }
        let name = words.next()?.trim_end_matches(';');
        Some((qualifier, glsl_type(ty), name))
    })
}

fn glsl_type(name: &str) -> VariableType {
    match name {
        "float" => VariableType::Float,
        "vec2" => VariableType::FloatVec2,
        "vec3" => VariableType::FloatVec3,
        "vec4" => VariableType::FloatVec4,
        "mat3" => VariableType::FloatMat3,
        "mat4" => VariableType::FloatMat4,
        "sampler2D" => VariableType::Sampler2D,
        _ => VariableType::Unsupported,
    }
}

impl RasterBackend for RecordingBackend {
    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> ShaderId {
        let id = ShaderId(self.allocate());
        self.shaders.insert(
            id,
            ShaderRecord {
                stage,
                source: source.to_owned(),
                compiled: None,
            },
        );
        self.calls.push(BackendCall::CreateShader(id, stage));
        id
    }

    fn compile_shader(&mut self, shader: ShaderId) -> bool {
        let ok = match self.shaders.get_mut(&shader) {
            Some(record) => {
                let ok = record.source.contains("main(");
                record.compiled = Some(ok);
                ok
            }
            None => false,
        };
        self.calls.push(BackendCall::CompileShader(shader, ok));
        ok
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        match self.shaders.get(&shader) {
            Some(ShaderRecord {
                compiled: Some(false),
                ..
            }) => "ERROR: 0:1: 'main' : missing entry point".to_owned(),
            Some(_) => String::new(),
            None => "ERROR: invalid shader object".to_owned(),
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
        self.calls.push(BackendCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.allocate());
        self.programs.insert(id, ProgramRecord::default());
        self.calls.push(BackendCall::CreateProgram(id));
        id
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.shaders.push(shader);
        }
        self.calls.push(BackendCall::AttachShader(program, shader));
    }

    fn link_program(&mut self, program: ProgramId) -> bool {
        let Some(record) = self.programs.get(&program) else {
            self.calls.push(BackendCall::LinkProgram(program, false));
            return false;
        };

        let stages: Vec<&ShaderRecord> = record
            .shaders
            .iter()
            .filter_map(|id| self.shaders.get(id))
            .collect();
        let has = |stage: ShaderStage| stages.iter().any(|s| s.stage == stage);

        let failure = if self.fail_links {
            Some("ERROR: link rejected".to_owned())
        } else if !has(ShaderStage::Vertex) || !has(ShaderStage::Fragment) {
            Some("ERROR: program needs a vertex and a fragment stage".to_owned())
        } else if stages.iter().any(|s| s.compiled != Some(true)) {
            Some("ERROR: attached shader was not compiled successfully".to_owned())
        } else {
            None
        };

        let mut uniforms: Vec<ActiveVariable> = Vec::new();
        let mut attributes: Vec<ActiveVariable> = Vec::new();
        if failure.is_none() {
            for shader in &stages {
                for (qualifier, ty, name) in declarations(&shader.source) {
                    if qualifier == "attribute" && shader.stage == ShaderStage::Vertex {
                        let location = attributes.len() as u32;
                        attributes.push(ActiveVariable::new(name, ty, location));
                    } else if qualifier == "uniform" && !uniforms.iter().any(|u| u.name == name) {
                        let location = uniforms.len() as u32;
                        uniforms.push(ActiveVariable::new(name, ty, location));
                    }
                }
            }
        }

        let linked = failure.is_none();
        if let Some(record) = self.programs.get_mut(&program) {
            record.linked = linked;
            record.log = failure.unwrap_or_default();
            record.uniforms = uniforms;
            record.attributes = attributes;
        }
        self.calls.push(BackendCall::LinkProgram(program, linked));
        linked
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_else(|| "ERROR: invalid program object".to_owned())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.calls.push(BackendCall::DeleteProgram(program));
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveVariable> {
        self.programs
            .get(&program)
            .filter(|p| p.linked)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveVariable> {
        self.programs
            .get(&program)
            .filter(|p| p.linked)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        self.calls.push(BackendCall::SetUniform(location, *value));
    }

    fn create_texture(&mut self) -> TextureId {
        let id = TextureId(self.allocate());
        self.calls.push(BackendCall::CreateTexture(id));
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.calls.push(BackendCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.calls.push(BackendCall::BindTexture(texture));
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, rgba: Option<&[u8]>) {
        self.calls.push(BackendCall::TexImage2D {
            width,
            height,
            with_data: rgba.is_some(),
        });
    }

    fn texture_parameters(&mut self, filter: TextureFilter, wrap: TextureWrap) {
        self.calls.push(BackendCall::TextureParameters(filter, wrap));
    }

    fn create_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId(self.allocate());
        self.calls.push(BackendCall::CreateFramebuffer(id));
        id
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.calls.push(BackendCall::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture(&mut self, texture: TextureId) {
        self.calls.push(BackendCall::FramebufferTexture(texture));
    }

    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId(self.allocate());
        self.buffers.insert(id, Vec::new());
        self.calls.push(BackendCall::CreateBuffer(id));
        id
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        self.bound_buffers.insert(target, buffer);
        self.calls.push(BackendCall::BindBuffer(target, buffer));
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        if let Some(contents) = self
            .bound_buffers
            .get(&target)
            .and_then(|id| self.buffers.get_mut(id))
        {
            *contents = data.to_vec();
        }
        self.calls.push(BackendCall::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        if let Some(contents) = self
            .bound_buffers
            .get(&target)
            .and_then(|id| self.buffers.get_mut(id))
        {
            let end = offset + data.len();
            if end <= contents.len() {
                contents[offset..end].copy_from_slice(data);
            }
        }
        self.calls.push(BackendCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn enable_vertex_attribute(&mut self, location: u32) {
        self.calls.push(BackendCall::EnableVertexAttribute(location));
    }

    fn vertex_attribute_pointer(
        &mut self,
        location: u32,
        components: u32,
        stride: u32,
        offset: u32,
    ) {
        self.calls.push(BackendCall::VertexAttributePointer {
            location,
            components,
            stride,
            offset,
        });
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(BackendCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn enable_alpha_blending(&mut self) {
        self.calls.push(BackendCall::EnableAlphaBlending);
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(BackendCall::Clear(color));
    }

    fn draw_elements(&mut self, count: u32, offset: u32) {
        self.calls.push(BackendCall::DrawElements { count, offset });
    }
}
