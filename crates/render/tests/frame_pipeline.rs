use glam::{Mat4, Vec2, Vec3};
use retkit_kernel::Sprite;
use retkit_render::{
    BackendCall, BatchError, BatchVertex, BufferTarget, ImageData, ProgramError, Quad,
    RecordingBackend, Renderer, ShaderStage, TextureFilter, TextureWrap, UniformError,
    UniformValue, VariableType,
};

const VERTEX: &str = "attribute vec2 a_Position;
attribute vec3 a_Color;
attribute vec2 a_TexCoord;

uniform mat4 u_Matrix;

void main() {
    gl_Position = u_Matrix * vec4(a_Position, 0, 1);
}";

const FRAGMENT: &str = "precision mediump float;

uniform sampler2D u_Texture;

void main() {
    gl_FragColor = texture2D(u_Texture, vec2(0));
}";

fn renderer() -> Renderer<RecordingBackend> {
    Renderer::new(RecordingBackend::new(), 320, 200)
}

fn sprite_at(x: f32, y: f32) -> Sprite {
    let mut s = Sprite::new(Vec2::splat(16.0), Vec2::ZERO, Vec2::splat(0.25));
    s.position = Vec2::new(x, y);
    s
}

#[test]
fn program_introspection_builds_layout_and_uniforms() {
    let mut r = renderer();
    let program = r.build_program(VERTEX, FRAGMENT).unwrap();

    let matrix = program.uniform("u_Matrix").unwrap();
    assert_eq!(matrix.ty, VariableType::FloatMat4);
    assert_eq!(program.uniform("u_Texture").unwrap().ty, VariableType::Sampler2D);
    assert!(program.uniform("u_Missing").is_none());

    let layout = program.vertex_layout();
    assert_eq!(layout.stride, BatchVertex::SIZE as u32);
    assert_eq!(layout.entries.len(), 3);

    // Both stages are released once linked.
    assert_eq!(r.backend().live_shaders(), 0);
    assert_eq!(r.backend().live_programs(), 1);
}

#[test]
fn compile_failure_returns_error_and_cleans_up() {
    let mut r = renderer();
    let err = r.build_program(VERTEX, "precision mediump float;").unwrap_err();
    assert!(matches!(
        err,
        ProgramError::Compile {
            stage: ShaderStage::Fragment,
            ..
        }
    ));
    let backend = r.backend();
    assert_eq!(backend.live_shaders(), 0);
    assert_eq!(backend.live_programs(), 0);
    assert_eq!(backend.count(|c| matches!(c, BackendCall::CreateProgram(_))), 0);
}

#[test]
fn link_failure_deletes_program() {
    let mut r = renderer();
    r.backend_mut().fail_links(true);
    let err = r.build_program(VERTEX, FRAGMENT).unwrap_err();
    assert!(matches!(err, ProgramError::Link { .. }));
    assert_eq!(r.backend().live_programs(), 0);
    assert_eq!(r.backend().count(|c| matches!(c, BackendCall::DeleteProgram(_))), 1);
}

#[test]
fn uniforms_are_type_checked() {
    let mut r = renderer();
    let program = r.build_program(VERTEX, FRAGMENT).unwrap();
    let matrix = program.uniform("u_Matrix").unwrap();

    r.set_program_uniform(&program, matrix, Mat4::IDENTITY).unwrap();
    assert!(r.backend().calls().contains(&BackendCall::SetUniform(
        matrix.location,
        UniformValue::Mat4(Mat4::IDENTITY.to_cols_array())
    )));

    assert_eq!(
        r.set_program_uniform(&program, matrix, Vec3::ONE),
        Err(UniformError::TypeMismatch {
            expected: VariableType::FloatMat4,
            found: VariableType::FloatVec3
        })
    );
    assert_eq!(
        r.set_uniform_by_name(&program, "u_Nope", UniformValue::Sampler(0)),
        Err(UniformError::Unknown("u_Nope".into()))
    );
    r.set_uniform_by_name(&program, "u_Texture", UniformValue::Sampler(0))
        .unwrap();
}

#[test]
fn flush_uploads_live_range_and_draw_covers_it() {
    let mut r = renderer();
    let program = r.build_program(VERTEX, FRAGMENT).unwrap();
    let texture = r.build_texture(None::<ImageData>);
    let mut batch = r.build_batch(64).unwrap();

    for i in 0..3 {
        batch.push_sprite(&sprite_at(i as f32 * 16.0, 0.0)).unwrap();
    }
    r.flush_batch(&mut batch);
    assert_eq!(batch.pushed_quads(), 0);
    assert_eq!(batch.flushed_quads(), 3);

    let uploaded = r
        .backend()
        .buffer_contents(batch.vertex_buffer())
        .unwrap();
    let fifth: BatchVertex =
        bytemuck::pod_read_unaligned(&uploaded[4 * BatchVertex::SIZE..5 * BatchVertex::SIZE]);
    assert_eq!(fifth.position, [16.0, 16.0]);
    assert!(r.backend().calls().contains(&BackendCall::BufferSubData {
        target: BufferTarget::Array,
        offset: 0,
        len: 12 * BatchVertex::SIZE,
    }));

    r.backend_mut().clear_calls();
    r.draw_batch(&batch, &program, None, texture.id());
    let calls = r.backend().calls();
    assert_eq!(calls.first(), Some(&BackendCall::UseProgram(program.id())));
    assert!(calls.contains(&BackendCall::Viewport {
        x: 0,
        y: 0,
        width: 320,
        height: 200
    }));
    assert!(calls.contains(&BackendCall::VertexAttributePointer {
        location: 2,
        components: 2,
        stride: 28,
        offset: 20
    }));
    assert_eq!(
        calls.last(),
        Some(&BackendCall::DrawElements {
            count: 18,
            offset: 0
        })
    );
    // Default framebuffer was already current.
    assert!(!calls.iter().any(|c| matches!(c, BackendCall::BindFramebuffer(_))));
}

#[test]
fn index_buffer_is_uploaded_once_at_build() {
    let mut r = renderer();
    let batch = r.build_batch(2).unwrap();
    let indices = r.backend().buffer_contents(batch.element_buffer()).unwrap();
    let indices: Vec<u16> = indices
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(indices, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
}

#[test]
fn batch_overflow_and_oversize_are_errors() {
    let mut r = renderer();
    assert!(matches!(
        r.build_batch(20_000),
        Err(BatchError::IndexRangeExceeded { .. })
    ));

    let mut batch = r.build_batch(1).unwrap();
    let quad = Quad {
        position: Vec2::ZERO,
        size: Vec2::ONE,
        texel_min: Vec2::ZERO,
        texel_max: Vec2::ONE,
        color: Vec3::ONE,
    };
    batch.push_quad(quad).unwrap();
    assert_eq!(
        batch.push_quad(quad),
        Err(BatchError::CapacityExceeded { capacity: 1 })
    );
}

#[test]
fn repeated_frames_elide_redundant_binds() {
    let mut r = renderer();
    let program = r.build_program(VERTEX, FRAGMENT).unwrap();
    let texture = r.build_texture(None::<ImageData>);
    let mut batch = r.build_batch(8).unwrap();

    for _ in 0..10 {
        batch.push_sprite(&sprite_at(0.0, 0.0)).unwrap();
        r.flush_batch(&mut batch);
        r.draw_batch(&batch, &program, None, texture.id());
    }

    let backend = r.backend();
    assert_eq!(backend.count(|c| matches!(c, BackendCall::UseProgram(_))), 1);
    assert_eq!(backend.count(|c| matches!(c, BackendCall::BindTexture(_))), 1);
    assert_eq!(backend.draw_calls(), 10);

    let stats = r.bind_stats();
    assert_eq!(stats.programs.issued, 1);
    assert_eq!(stats.programs.elided, 9);
    assert_eq!(stats.textures.elided, 9);
    assert_eq!(stats.framebuffers.issued, 0);
}

#[test]
fn binding_a_different_texture_issues_a_second_call() {
    let mut r = renderer();
    let a = r.build_texture(None::<ImageData>);
    let b = r.build_texture(None::<ImageData>);
    r.bind_texture(a.id());
    r.bind_texture(a.id());
    r.bind_texture(b.id());
    assert_eq!(r.backend().count(|c| matches!(c, BackendCall::BindTexture(_))), 2);
}

#[test]
fn texture_uploads_when_source_is_ready() {
    let mut r = renderer();
    let (tx, rx) = std::sync::mpsc::channel();
    let mut texture = r.build_texture(rx);

    assert!(!r.refresh_texture(&mut texture));
    assert!(!texture.loaded());
    assert_eq!(texture.width(), 0);

    tx.send(ImageData::filled(64, 32, [255; 4])).unwrap();
    assert!(r.refresh_texture(&mut texture));
    assert!(texture.loaded());
    assert_eq!((texture.width(), texture.height()), (64, 32));
    assert!(r.backend().calls().contains(&BackendCall::TexImage2D {
        width: 64,
        height: 32,
        with_data: true
    }));
    assert!(!r.refresh_texture(&mut texture));
}

#[test]
fn framebuffer_build_keeps_bind_cache_in_sync() {
    let mut r = renderer();
    let program = r.build_program(VERTEX, FRAGMENT).unwrap();
    let texture = r.build_texture(None::<ImageData>);
    let mut batch = r.build_batch(4).unwrap();

    let target = r.build_framebuffer(160, 100);
    assert!(r.backend().calls().contains(&BackendCall::TextureParameters(
        TextureFilter::Nearest,
        TextureWrap::ClampToEdge
    )));
    assert!(r
        .backend()
        .calls()
        .contains(&BackendCall::FramebufferTexture(target.texture())));
    assert_eq!(r.bind_state().framebuffer(), Some(target.id()));

    // Drawing to the default target afterwards must rebind it.
    batch.push_sprite(&sprite_at(0.0, 0.0)).unwrap();
    r.flush_batch(&mut batch);
    r.backend_mut().clear_calls();
    r.draw_batch(&batch, &program, None, texture.id());
    assert!(r.backend().calls().contains(&BackendCall::BindFramebuffer(None)));

    // Sampling the offscreen target's texture in a later pass.
    r.draw_batch(&batch, &program, Some(&target), target.texture());
    assert!(r
        .backend()
        .calls()
        .contains(&BackendCall::BindFramebuffer(Some(target.id()))));
}

#[test]
fn empty_frame_still_draws_zero_indices() {
    let mut r = renderer();
    let program = r.build_program(VERTEX, FRAGMENT).unwrap();
    let texture = r.build_texture(None::<ImageData>);
    let mut batch = r.build_batch(4).unwrap();
    r.flush_batch(&mut batch);
    r.draw_batch(&batch, &program, None, texture.id());
    assert!(!r
        .backend()
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::BufferSubData { .. })));
    assert!(r.backend().calls().contains(&BackendCall::DrawElements {
        count: 0,
        offset: 0
    }));
}

#[test]
fn resize_viewport_applies_to_next_draw() {
    let mut r = renderer();
    let program = r.build_program(VERTEX, FRAGMENT).unwrap();
    let texture = r.build_texture(None::<ImageData>);
    let batch = r.build_batch(1).unwrap();
    r.resize_viewport(640, 400);
    r.enable_alpha_blending();
    r.clear([0.0, 0.0, 0.0, 1.0]);
    r.draw_batch(&batch, &program, None, texture.id());
    let calls = r.backend().calls();
    assert!(calls.contains(&BackendCall::EnableAlphaBlending));
    assert!(calls.contains(&BackendCall::Clear([0.0, 0.0, 0.0, 1.0])));
    assert!(calls.contains(&BackendCall::Viewport {
        x: 0,
        y: 0,
        width: 640,
        height: 400
    }));
}
