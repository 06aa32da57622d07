//! WGSL front end: parse, validate and reflect shaders with naga.
//!
//! Programs are described the way the renderer expects from any backend:
//! vertex attributes by `@location`, uniforms by name with their
//! `@binding` as location. Only bind group 0 is supported.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, ImageDimension, Module, ScalarKind, TypeInner, VectorSize};
use retkit_render::{ActiveVariable, ShaderStage, VariableType};

/// A parsed and validated shader stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub module: Module,
    pub entry_point: String,
}

/// Parse and validate `source` and find its entry point for `stage`.
/// The error is a printable diagnostic.
pub fn compile_wgsl(stage: ShaderStage, source: &str) -> Result<CompiledStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .map(|ep| ep.name.clone())
        .ok_or_else(|| format!("no {stage:?} entry point in module"))?;

    Ok(CompiledStage {
        module,
        entry_point,
    })
}

/// What a resource binding in group 0 holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Uniform buffer of the given byte size.
    Uniform { size: u64 },
    Texture,
    Sampler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBinding {
    pub name: String,
    pub binding: u32,
    pub kind: BindingKind,
}

/// Interface of a linked vertex + fragment pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflection {
    pub attributes: Vec<ActiveVariable>,
    pub uniforms: Vec<ActiveVariable>,
    pub bindings: Vec<ResourceBinding>,
}

fn variable_type(inner: &TypeInner) -> VariableType {
    match *inner {
        TypeInner::Scalar(s) if s.kind == ScalarKind::Float => VariableType::Float,
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => match size {
            VectorSize::Bi => VariableType::FloatVec2,
            VectorSize::Tri => VariableType::FloatVec3,
            VectorSize::Quad => VariableType::FloatVec4,
        },
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Tri,
            ..
        } => VariableType::FloatMat3,
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            ..
        } => VariableType::FloatMat4,
        TypeInner::Image {
            dim: ImageDimension::D2,
            arrayed: false,
            ..
        } => VariableType::Sampler2D,
        _ => VariableType::Unsupported,
    }
}

/// Bytes a uniform of this type occupies in its buffer. `mat3x3` columns
/// are padded to 16 bytes.
pub fn uniform_size(ty: VariableType) -> u64 {
    match ty {
        VariableType::Float => 4,
        VariableType::FloatVec2 => 8,
        VariableType::FloatVec3 | VariableType::FloatVec4 => 16,
        VariableType::FloatMat3 => 48,
        VariableType::FloatMat4 => 64,
        VariableType::Sampler2D | VariableType::Unsupported => 0,
    }
}

fn vertex_inputs(stage: &CompiledStage) -> Vec<ActiveVariable> {
    let module = &stage.module;
    let Some(entry) = module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point)
    else {
        return Vec::new();
    };

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (Some(Binding::Location { location, .. }), inner) => {
                let name = arg.name.clone().unwrap_or_default();
                inputs.push(ActiveVariable::new(name, variable_type(inner), *location));
            }
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = member.binding {
                        let name = member.name.clone().unwrap_or_default();
                        let ty = variable_type(&module.types[member.ty].inner);
                        inputs.push(ActiveVariable::new(name, ty, location));
                    }
                }
            }
            _ => {}
        }
    }
    inputs.sort_by_key(|a| a.location);
    inputs
}

fn collect_bindings(module: &Module, out: &mut Vec<ResourceBinding>) -> Result<(), String> {
    for (_, global) in module.global_variables.iter() {
        let Some(binding) = &global.binding else {
            continue;
        };
        let name = global.name.clone().unwrap_or_default();
        if binding.group != 0 {
            return Err(format!(
                "`{name}` uses bind group {}; only group 0 is supported",
                binding.group
            ));
        }

        let inner = &module.types[global.ty].inner;
        let kind = match (global.space, inner) {
            (AddressSpace::Uniform, inner) => {
                let size = uniform_size(variable_type(inner));
                if size == 0 {
                    return Err(format!("uniform `{name}` has an unsupported type"));
                }
                BindingKind::Uniform { size }
            }
            (AddressSpace::Handle, TypeInner::Image { .. }) => BindingKind::Texture,
            (AddressSpace::Handle, TypeInner::Sampler { .. }) => BindingKind::Sampler,
            _ => return Err(format!("`{name}` has an unsupported resource type")),
        };

        match out.iter().find(|b| b.binding == binding.binding) {
            Some(existing) if existing.name == name && existing.kind == kind => {}
            Some(existing) => {
                return Err(format!(
                    "binding {} is declared as both `{}` and `{name}`",
                    binding.binding, existing.name
                ));
            }
            None => out.push(ResourceBinding {
                name,
                binding: binding.binding,
                kind,
            }),
        }
    }
    Ok(())
}

/// Combine a vertex and a fragment stage into one program interface.
pub fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<Reflection, String> {
    let mut bindings = Vec::new();
    collect_bindings(&vertex.module, &mut bindings)?;
    collect_bindings(&fragment.module, &mut bindings)?;
    bindings.sort_by_key(|b| b.binding);

    let uniforms = bindings
        .iter()
        .filter_map(|b| {
            let ty = match b.kind {
                BindingKind::Uniform { .. } => {
                    let global = find_global(&vertex.module, &b.name)
                        .or_else(|| find_global(&fragment.module, &b.name))?;
                    variable_type(global)
                }
                BindingKind::Texture => VariableType::Sampler2D,
                BindingKind::Sampler => return None,
            };
            Some(ActiveVariable::new(b.name.clone(), ty, b.binding))
        })
        .collect();

    Ok(Reflection {
        attributes: vertex_inputs(vertex),
        uniforms,
        bindings,
    })
}

fn find_global<'a>(module: &'a Module, name: &str) -> Option<&'a TypeInner> {
    module
        .global_variables
        .iter()
        .find(|(_, g)| g.name.as_deref() == Some(name))
        .map(|(_, g)| &module.types[g.ty].inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{SPRITE_FRAGMENT_WGSL, SPRITE_VERTEX_WGSL};

    fn sprite_program() -> Reflection {
        let vs = compile_wgsl(ShaderStage::Vertex, SPRITE_VERTEX_WGSL).unwrap();
        let fs = compile_wgsl(ShaderStage::Fragment, SPRITE_FRAGMENT_WGSL).unwrap();
        link(&vs, &fs).unwrap()
    }

    #[test]
    fn sprite_shaders_compile() {
        let vs = compile_wgsl(ShaderStage::Vertex, SPRITE_VERTEX_WGSL).unwrap();
        assert_eq!(vs.entry_point, "vs_main");
        let fs = compile_wgsl(ShaderStage::Fragment, SPRITE_FRAGMENT_WGSL).unwrap();
        assert_eq!(fs.entry_point, "fs_main");
    }

    #[test]
    fn attributes_reflect_locations_and_types() {
        let r = sprite_program();
        assert_eq!(
            r.attributes,
            vec![
                ActiveVariable::new("a_Position", VariableType::FloatVec2, 0),
                ActiveVariable::new("a_Color", VariableType::FloatVec3, 1),
                ActiveVariable::new("a_TexCoord", VariableType::FloatVec2, 2),
            ]
        );
    }

    #[test]
    fn uniforms_use_binding_as_location() {
        let r = sprite_program();
        assert_eq!(
            r.uniforms,
            vec![
                ActiveVariable::new("u_Matrix", VariableType::FloatMat4, 0),
                ActiveVariable::new("u_Texture", VariableType::Sampler2D, 1),
            ]
        );
        assert_eq!(r.bindings.len(), 3);
        assert_eq!(r.bindings[0].kind, BindingKind::Uniform { size: 64 });
        assert_eq!(r.bindings[2].kind, BindingKind::Sampler);
    }

    #[test]
    fn missing_stage_entry_fails() {
        let err = compile_wgsl(ShaderStage::Fragment, SPRITE_VERTEX_WGSL).unwrap_err();
        assert!(err.contains("Fragment"));
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = compile_wgsl(ShaderStage::Vertex, "fn vs_main( {").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn conflicting_bindings_fail_link() {
        let vs = compile_wgsl(
            ShaderStage::Vertex,
            "@group(0) @binding(0) var<uniform> u_A: vec4<f32>;
             @vertex fn vs_main() -> @builtin(position) vec4<f32> { return u_A; }",
        )
        .unwrap();
        let fs = compile_wgsl(
            ShaderStage::Fragment,
            "@group(0) @binding(0) var<uniform> u_B: vec4<f32>;
             @fragment fn fs_main() -> @location(0) vec4<f32> { return u_B; }",
        )
        .unwrap();
        let err = link(&vs, &fs).unwrap_err();
        assert!(err.contains("u_A") && err.contains("u_B"));
    }

    #[test]
    fn other_bind_groups_are_rejected() {
        let vs = compile_wgsl(
            ShaderStage::Vertex,
            "@group(1) @binding(0) var<uniform> u_A: mat3x3<f32>;
             @vertex fn vs_main() -> @builtin(position) vec4<f32> {
                 return vec4<f32>(u_A[0], 1.0);
             }",
        )
        .unwrap();
        let fs = compile_wgsl(
            ShaderStage::Fragment,
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        )
        .unwrap();
        assert!(link(&vs, &fs).unwrap_err().contains("group 1"));
    }

    #[test]
    fn uniform_sizes_pad_mat3() {
        assert_eq!(uniform_size(VariableType::FloatMat3), 48);
        assert_eq!(uniform_size(VariableType::FloatVec3), 16);
        assert_eq!(uniform_size(VariableType::Sampler2D), 0);
    }
}
