/// WGSL vertex stage for textured, tinted sprite quads. Positions are in
/// pixels and mapped to clip space by `u_Matrix`.
pub const SPRITE_VERTEX_WGSL: &str = r#"
@group(0) @binding(0)
var<uniform> u_Matrix: mat4x4<f32>;

struct VertexInput {
    @location(0) a_Position: vec2<f32>,
    @location(1) a_Color: vec3<f32>,
    @location(2) a_TexCoord: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) tex_coord: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u_Matrix * vec4<f32>(vertex.a_Position, 0.0, 1.0);
    out.color = vertex.a_Color;
    out.tex_coord = vertex.a_TexCoord;
    return out;
}
"#;

/// WGSL fragment stage: atlas texel times vertex tint.
pub const SPRITE_FRAGMENT_WGSL: &str = r#"
@group(0) @binding(1)
var u_Texture: texture_2d<f32>;

@group(0) @binding(2)
var u_Sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) tex_coord: vec2<f32>,
};

@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(u_Texture, u_Sampler, frag.tex_coord) * vec4<f32>(frag.color, 1.0);
}
"#;
