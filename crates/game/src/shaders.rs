/// GLSL sprite program for GL-style backends: pixel positions through
/// `u_Matrix`, atlas texel tinted by the vertex color.
pub const SPRITE_VERTEX_GLSL: &str = "attribute vec2 a_Position;
attribute vec3 a_Color;
attribute vec2 a_TexCoord;

uniform mat4 u_Matrix;

varying vec3 v_Color;
varying vec2 v_TexCoord;

void main() {
    gl_Position = u_Matrix * vec4(a_Position, 0, 1);

    v_Color = a_Color;
    v_TexCoord = a_TexCoord;
}";

pub const SPRITE_FRAGMENT_GLSL: &str = "precision mediump float;

varying vec3 v_Color;
varying vec2 v_TexCoord;

uniform sampler2D u_Texture;

void main() {
    gl_FragColor = texture2D(u_Texture, v_TexCoord) * vec4(v_Color, 1);
}";
