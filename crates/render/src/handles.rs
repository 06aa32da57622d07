//! Typed ids for backend objects and the small value types the backend
//! trait speaks in.
//!
//! One newtype per resource kind, so a texture id can never be bound as a
//! framebuffer.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

backend_id!(TextureId);
backend_id!(FramebufferId);
backend_id!(ProgramId);
backend_id!(ShaderId);
backend_id!(BufferId);
backend_id!(
    /// Where a uniform lives inside its linked program.
    UniformLocation
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferTarget {
    /// Vertex data.
    Array,
    /// 16-bit indices.
    ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
}

/// Type tag of an active shader variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    FloatMat3,
    FloatMat4,
    Sampler2D,
    Unsupported,
}

/// A uniform or attribute reported by a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    pub ty: VariableType,
    pub location: u32,
}

impl ActiveVariable {
    pub fn new(name: impl Into<String>, ty: VariableType, location: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            location,
        }
    }
}

/// Uniform payload. Matrices are column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
    /// Texture unit index.
    Sampler(i32),
}

impl UniformValue {
    pub fn variable_type(&self) -> VariableType {
        match self {
            UniformValue::Float(_) => VariableType::Float,
            UniformValue::Vec2(_) => VariableType::FloatVec2,
            UniformValue::Vec3(_) => VariableType::FloatVec3,
            UniformValue::Vec4(_) => VariableType::FloatVec4,
            UniformValue::Mat3(_) => VariableType::FloatMat3,
            UniformValue::Mat4(_) => VariableType::FloatMat4,
            UniformValue::Sampler(_) => VariableType::Sampler2D,
        }
    }

    /// Raw little-endian bytes as a uniform buffer would hold them, without
    /// any alignment padding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let floats: &[f32] = match self {
            UniformValue::Float(v) => std::slice::from_ref(v),
            UniformValue::Vec2(v) => &v[..],
            UniformValue::Vec3(v) => &v[..],
            UniformValue::Vec4(v) => &v[..],
            UniformValue::Mat3(v) => &v[..],
            UniformValue::Mat4(v) => &v[..],
            UniformValue::Sampler(unit) => return unit.to_le_bytes().to_vec(),
        };
        floats.iter().flat_map(|f| f.to_le_bytes()).collect()
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v.to_array())
    }
}

impl From<Mat3> for UniformValue {
    fn from(m: Mat3) -> Self {
        UniformValue::Mat3(m.to_cols_array())
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        UniformValue::Mat4(m.to_cols_array())
    }
}
