use std::collections::BTreeMap;
use thiserror::Error;

use crate::backend::RasterBackend;
use crate::handles::{ProgramId, ShaderId, ShaderStage, UniformLocation, UniformValue, VariableType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("{stage:?} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UniformError {
    #[error("uniform `{0}` is not active in this program")]
    Unknown(String),
    #[error("uniform expects {expected:?}, got {found:?}")]
    TypeMismatch {
        expected: VariableType,
        found: VariableType,
    },
}

/// The vertex inputs a batch can feed, in interleaved order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Color,
    TexCoord,
}

impl VertexAttribute {
    pub const ALL: [VertexAttribute; 3] = [
        VertexAttribute::Position,
        VertexAttribute::Color,
        VertexAttribute::TexCoord,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "a_Position",
            VertexAttribute::Color => "a_Color",
            VertexAttribute::TexCoord => "a_TexCoord",
        }
    }

    pub fn components(self) -> u32 {
        match self {
            VertexAttribute::Position | VertexAttribute::TexCoord => 2,
            VertexAttribute::Color => 3,
        }
    }

    pub fn byte_size(self) -> u32 {
        self.components() * 4
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uniform {
    pub location: UniformLocation,
    pub ty: VariableType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub location: u32,
    pub ty: VariableType,
}

/// One enabled slot of a vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub attribute: VertexAttribute,
    pub location: u32,
    pub components: u32,
    pub offset: u32,
}

/// Attribute pointers for the program's active inputs, tightly packed in
/// declared order. Stride is the sum of the enabled attributes only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u32,
    pub entries: Vec<LayoutEntry>,
}

impl VertexLayout {
    fn from_slots(slots: &[Option<Attribute>; 3]) -> Self {
        let mut layout = VertexLayout::default();
        for (attribute, slot) in VertexAttribute::ALL.into_iter().zip(slots) {
            if let Some(a) = slot {
                layout.entries.push(LayoutEntry {
                    attribute,
                    location: a.location,
                    components: attribute.components(),
                    offset: layout.stride,
                });
                layout.stride += attribute.byte_size();
            }
        }
        layout
    }
}

/// A linked program with its active variables looked up once at link time.
#[derive(Debug, Clone)]
pub struct Program {
    id: ProgramId,
    uniforms: BTreeMap<String, Uniform>,
    attributes: [Option<Attribute>; 3],
    layout: VertexLayout,
}

impl Program {
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn uniform(&self, name: &str) -> Option<Uniform> {
        self.uniforms.get(name).copied()
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, Uniform)> {
        self.uniforms.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn attribute(&self, attribute: VertexAttribute) -> Option<Attribute> {
        self.attributes[attribute as usize]
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.layout
    }
}

impl Uniform {
    pub fn check(&self, value: &UniformValue) -> Result<(), UniformError> {
        let found = value.variable_type();
        if found != self.ty {
            return Err(UniformError::TypeMismatch {
                expected: self.ty,
                found,
            });
        }
        Ok(())
    }
}

fn compile<B: RasterBackend + ?Sized>(
    backend: &mut B,
    stage: ShaderStage,
    source: &str,
) -> Result<ShaderId, ProgramError> {
    let shader = backend.create_shader(stage, source);
    if backend.compile_shader(shader) {
        return Ok(shader);
    }
    let log = backend.shader_info_log(shader);
    tracing::error!(?stage, %log, "shader compile error");
    backend.delete_shader(shader);
    Err(ProgramError::Compile { stage, log })
}

/// Compile both stages, link, and introspect. On any failure the backend
/// objects created so far are deleted and nothing usable is returned.
pub(crate) fn build<B: RasterBackend + ?Sized>(
    backend: &mut B,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<Program, ProgramError> {
    let vertex = compile(backend, ShaderStage::Vertex, vertex_source)?;
    let fragment = match compile(backend, ShaderStage::Fragment, fragment_source) {
        Ok(shader) => shader,
        Err(e) => {
            backend.delete_shader(vertex);
            return Err(e);
        }
    };

    let id = backend.create_program();
    backend.attach_shader(id, vertex);
    backend.attach_shader(id, fragment);
    let linked = backend.link_program(id);
    backend.delete_shader(vertex);
    backend.delete_shader(fragment);

    if !linked {
        let log = backend.program_info_log(id);
        tracing::error!(program = id.0, %log, "program link error");
        backend.delete_program(id);
        return Err(ProgramError::Link { log });
    }

    let uniforms: BTreeMap<String, Uniform> = backend
        .active_uniforms(id)
        .into_iter()
        .map(|u| {
            let uniform = Uniform {
                location: UniformLocation(u.location),
                ty: u.ty,
            };
            (u.name, uniform)
        })
        .collect();

    let mut attributes = [None; 3];
    for active in backend.active_attributes(id) {
        match VertexAttribute::from_name(&active.name) {
            Some(slot) => {
                attributes[slot as usize] = Some(Attribute {
                    location: active.location,
                    ty: active.ty,
                })
            }
            None => tracing::debug!(name = %active.name, "ignoring unknown vertex attribute"),
        }
    }
    let layout = VertexLayout::from_slots(&attributes);

    tracing::debug!(
        program = id.0,
        uniforms = uniforms.len(),
        stride = layout.stride,
        "program linked"
    );
    Ok(Program {
        id,
        uniforms,
        attributes,
        layout,
    })
}
