use crate::reflect::{self, BindingKind, CompiledStage, Reflection};
use retkit_render::{
    ActiveVariable, BufferId, BufferTarget, BufferUsage, FramebufferId, ProgramId,
    RasterBackend, ShaderId, ShaderStage, TextureFilter, TextureId, TextureWrap,
    UniformLocation, UniformValue,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use wgpu::util::DeviceExt;

/// Format of textures created through the backend, offscreen targets included.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: Option<CompiledStage>,
    log: String,
}

struct LinkedProgram {
    vertex: wgpu::ShaderModule,
    vertex_entry: String,
    fragment: wgpu::ShaderModule,
    fragment_entry: String,
    reflection: Reflection,
    uniform_buffers: BTreeMap<u32, wgpu::Buffer>,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<ShaderId>,
    linked: Option<LinkedProgram>,
    log: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    stride: u32,
    /// (location, components, offset)
    attributes: Vec<(u32, u32, u32)>,
    format: wgpu::TextureFormat,
    blend: bool,
}

struct TextureStorage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

#[derive(Default)]
struct TextureObject {
    storage: Option<TextureStorage>,
    sampler: Option<wgpu::Sampler>,
}

#[derive(Default)]
struct BufferObject {
    buffer: Option<wgpu::Buffer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttributePointer {
    components: u32,
    stride: u32,
    offset: u32,
}

struct Frame {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// [`RasterBackend`] over a wgpu device.
///
/// Bind state lives here as plain fields and is turned into pipelines and
/// bind groups when a draw is issued. Pipelines are built lazily, one per
/// program, vertex layout, target format and blend mode. Shaders are WGSL
/// with resources in bind group 0; a uniform's location is its binding.
///
/// Drawing to the default target needs a frame from
/// [`WgpuBackend::begin_frame`]; without one, draws and clears are skipped.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    next_id: u32,

    shaders: BTreeMap<ShaderId, ShaderObject>,
    programs: BTreeMap<ProgramId, ProgramObject>,
    textures: BTreeMap<TextureId, TextureObject>,
    framebuffers: BTreeMap<FramebufferId, Option<TextureId>>,
    buffers: BTreeMap<BufferId, BufferObject>,

    program: Option<ProgramId>,
    texture: Option<TextureId>,
    framebuffer: Option<FramebufferId>,
    array_buffer: Option<BufferId>,
    element_buffer: Option<BufferId>,
    enabled_attributes: BTreeSet<u32>,
    attribute_pointers: BTreeMap<u32, AttributePointer>,
    viewport: (i32, i32, u32, u32),
    blend: bool,

    placeholder: TextureStorage,
    default_sampler: wgpu::Sampler,
    frame: Option<Frame>,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            tracing::error!(%error, "wgpu validation error");
        }));

        let placeholder = create_storage(&device, 1, 1, "placeholder_texture");
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &placeholder.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0, 0, 0, 0],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let default_sampler =
            create_sampler(&device, TextureFilter::Nearest, TextureWrap::ClampToEdge);

        Self {
            device,
            queue,
            surface_format,
            next_id: 1,
            shaders: BTreeMap::new(),
            programs: BTreeMap::new(),
            textures: BTreeMap::new(),
            framebuffers: BTreeMap::new(),
            buffers: BTreeMap::new(),
            program: None,
            texture: None,
            framebuffer: None,
            array_buffer: None,
            element_buffer: None,
            enabled_attributes: BTreeSet::new(),
            attribute_pointers: BTreeMap::new(),
            viewport: (0, 0, 0, 0),
            blend: false,
            placeholder,
            default_sampler,
            frame: None,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Make `surface` the default target until [`WgpuBackend::present_frame`].
    pub fn begin_frame(&mut self, surface: wgpu::SurfaceTexture) {
        let view = surface.texture.create_view(&Default::default());
        self.frame = Some(Frame { surface, view });
    }

    pub fn present_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.surface.present();
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn bound_buffer(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        }
    }

    /// Color texture of the bound framebuffer, if one is attached.
    fn framebuffer_texture_id(&self) -> Option<TextureId> {
        self.framebuffer
            .and_then(|fb| self.framebuffers.get(&fb).copied().flatten())
    }

    /// View, format and size of the current render target.
    fn target(&self) -> Option<(&wgpu::TextureView, wgpu::TextureFormat, u32, u32)> {
        match self.framebuffer {
            Some(_) => {
                let storage = self
                    .framebuffer_texture_id()
                    .and_then(|id| self.textures.get(&id))
                    .and_then(|t| t.storage.as_ref())?;
                let size = storage.texture.size();
                Some((&storage.view, TEXTURE_FORMAT, size.width, size.height))
            }
            None => {
                let frame = self.frame.as_ref()?;
                let size = frame.surface.texture.size();
                Some((&frame.view, self.surface_format, size.width, size.height))
            }
        }
    }

    fn try_link(&self, program: ProgramId) -> Result<LinkedProgram, String> {
        let object = self
            .programs
            .get(&program)
            .ok_or_else(|| format!("unknown program {}", program.0))?;

        let mut vertex = None;
        let mut fragment = None;
        for id in &object.attached {
            let Some(shader) = self.shaders.get(id) else {
                continue;
            };
            let compiled = shader
                .compiled
                .as_ref()
                .ok_or_else(|| format!("shader {} did not compile", id.0))?;
            match shader.stage {
                ShaderStage::Vertex => vertex = Some((shader, compiled)),
                ShaderStage::Fragment => fragment = Some((shader, compiled)),
            }
        }
        let (vs, vs_stage) = vertex.ok_or("no vertex shader attached")?;
        let (fs, fs_stage) = fragment.ok_or("no fragment shader attached")?;
        let reflection = reflect::link(vs_stage, fs_stage)?;

        let vertex_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vertex_shader"),
            source: wgpu::ShaderSource::Wgsl(vs.source.as_str().into()),
        });
        let fragment_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fragment_shader"),
            source: wgpu::ShaderSource::Wgsl(fs.source.as_str().into()),
        });

        let mut uniform_buffers = BTreeMap::new();
        let mut entries = Vec::with_capacity(reflection.bindings.len());
        for binding in &reflection.bindings {
            let ty = match binding.kind {
                BindingKind::Uniform { size } => {
                    let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some("uniform_buffer"),
                        size,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    });
                    uniform_buffers.insert(binding.binding, buffer);
                    wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    }
                }
                BindingKind::Texture => wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                BindingKind::Sampler => {
                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                }
            };
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: binding.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty,
                count: None,
            });
        }

        let bind_group_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("program_bind_group_layout"),
                entries: &entries,
            });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("program_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        Ok(LinkedProgram {
            vertex: vertex_module,
            vertex_entry: vs_stage.entry_point.clone(),
            fragment: fragment_module,
            fragment_entry: fs_stage.entry_point.clone(),
            reflection,
            uniform_buffers,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
        })
    }

    /// Vertex layout the current attribute state gives `linked`, or `None`
    /// if an attribute it reads has no enabled pointer.
    fn pipeline_key(
        &self,
        linked: &LinkedProgram,
        format: wgpu::TextureFormat,
    ) -> Option<PipelineKey> {
        let mut stride = None;
        let mut attributes = Vec::with_capacity(linked.reflection.attributes.len());
        for attribute in &linked.reflection.attributes {
            let pointer = self
                .enabled_attributes
                .contains(&attribute.location)
                .then(|| self.attribute_pointers.get(&attribute.location))
                .flatten();
            let Some(pointer) = pointer else {
                tracing::warn!(attribute = %attribute.name, "attribute has no enabled pointer");
                return None;
            };
            if *stride.get_or_insert(pointer.stride) != pointer.stride {
                tracing::warn!(attribute = %attribute.name, "attributes disagree on stride");
                return None;
            }
            attributes.push((attribute.location, pointer.components, pointer.offset));
        }
        Some(PipelineKey {
            stride: stride.unwrap_or(0),
            attributes,
            format,
            blend: self.blend,
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        linked: &LinkedProgram,
        key: &PipelineKey,
    ) -> wgpu::RenderPipeline {
        let attributes: Vec<wgpu::VertexAttribute> = key
            .attributes
            .iter()
            .map(|&(location, components, offset)| wgpu::VertexAttribute {
                format: float_format(components),
                offset: u64::from(offset),
                shader_location: location,
            })
            .collect();
        let blend = if key.blend {
            wgpu::BlendState::ALPHA_BLENDING
        } else {
            wgpu::BlendState::REPLACE
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("program_pipeline"),
            layout: Some(&linked.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &linked.vertex,
                entry_point: Some(linked.vertex_entry.as_str()),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: u64::from(key.stride),
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &linked.fragment,
                entry_point: Some(linked.fragment_entry.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }

    fn bind_group(&self, linked: &LinkedProgram) -> wgpu::BindGroup {
        let target_texture = self.framebuffer_texture_id();
        let texture = self
            .texture
            .filter(|id| Some(*id) != target_texture)
            .and_then(|id| self.textures.get(&id));
        let view = texture
            .and_then(|t| t.storage.as_ref())
            .map_or(&self.placeholder.view, |s| &s.view);
        let sampler = texture
            .and_then(|t| t.sampler.as_ref())
            .unwrap_or(&self.default_sampler);

        let entries: Vec<wgpu::BindGroupEntry> = linked
            .reflection
            .bindings
            .iter()
            .filter_map(|binding| {
                let resource = match binding.kind {
                    BindingKind::Uniform { .. } => linked
                        .uniform_buffers
                        .get(&binding.binding)?
                        .as_entire_binding(),
                    BindingKind::Texture => wgpu::BindingResource::TextureView(view),
                    BindingKind::Sampler => wgpu::BindingResource::Sampler(sampler),
                };
                Some(wgpu::BindGroupEntry {
                    binding: binding.binding,
                    resource,
                })
            })
            .collect();

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("program_bind_group"),
            layout: &linked.bind_group_layout,
            entries: &entries,
        })
    }
}

impl fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("surface_format", &self.surface_format)
            .field("programs", &self.programs.len())
            .field("textures", &self.textures.len())
            .field("buffers", &self.buffers.len())
            .field("in_frame", &self.frame.is_some())
            .finish()
    }
}

fn create_storage(device: &wgpu::Device, width: u32, height: u32, label: &str) -> TextureStorage {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&Default::default());
    TextureStorage { texture, view }
}

fn create_sampler(
    device: &wgpu::Device,
    filter: TextureFilter,
    wrap: TextureWrap,
) -> wgpu::Sampler {
    let filter = match filter {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear => wgpu::FilterMode::Linear,
    };
    let address = match wrap {
        TextureWrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        TextureWrap::Repeat => wgpu::AddressMode::Repeat,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("texture_sampler"),
        address_mode_u: address,
        address_mode_v: address,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    })
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Uniform bytes in buffer layout: `mat3x3` columns padded to 16 bytes.
fn uniform_bytes(value: &UniformValue) -> Vec<u8> {
    match value {
        UniformValue::Mat3(m) => m
            .chunks_exact(3)
            .flat_map(|column| [column[0], column[1], column[2], 0.0])
            .flat_map(f32::to_le_bytes)
            .collect(),
        other => other.to_bytes(),
    }
}

/// Pad `data` with zeros to the copy alignment wgpu requires.
fn pad_to_copy_alignment(data: &[u8]) -> Vec<u8> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let len = data.len().max(1).div_ceil(align) * align;
    let mut padded = data.to_vec();
    padded.resize(len, 0);
    padded
}

/// Clip a bottom-left-origin viewport to a `width` x `height` target and
/// flip it to top-left origin. `None` when nothing remains.
fn clip_viewport(
    (x, y, w, h): (i32, i32, u32, u32),
    width: u32,
    height: u32,
) -> Option<(u32, u32, u32, u32)> {
    let x0 = i64::from(x).clamp(0, i64::from(width));
    let y0 = i64::from(y).clamp(0, i64::from(height));
    let x1 = (i64::from(x) + i64::from(w)).clamp(0, i64::from(width));
    let y1 = (i64::from(y) + i64::from(h)).clamp(0, i64::from(height));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let top = i64::from(height) - y1;
    Some((x0 as u32, top as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

impl RasterBackend for WgpuBackend {
    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> ShaderId {
        let id = ShaderId(self.next_id());
        self.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: source.to_owned(),
                compiled: None,
                log: String::new(),
            },
        );
        id
    }

    fn compile_shader(&mut self, shader: ShaderId) -> bool {
        let Some(object) = self.shaders.get_mut(&shader) else {
            return false;
        };
        match reflect::compile_wgsl(object.stage, &object.source) {
            Ok(compiled) => {
                object.compiled = Some(compiled);
                object.log.clear();
                true
            }
            Err(log) => {
                object.compiled = None;
                object.log = log;
                false
            }
        }
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next_id());
        self.programs.insert(id, ProgramObject::default());
        id
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if let Some(object) = self.programs.get_mut(&program) {
            object.attached.push(shader);
        }
    }

    fn link_program(&mut self, program: ProgramId) -> bool {
        let result = self.try_link(program);
        let Some(object) = self.programs.get_mut(&program) else {
            return false;
        };
        match result {
            Ok(linked) => {
                object.linked = Some(linked);
                object.log.clear();
                true
            }
            Err(log) => {
                object.linked = None;
                object.log = log;
                false
            }
        }
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.program == Some(program) {
            self.program = None;
        }
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveVariable> {
        self.programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .map(|l| l.reflection.uniforms.clone())
            .unwrap_or_default()
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveVariable> {
        self.programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .map(|l| l.reflection.attributes.clone())
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: ProgramId) {
        self.program = Some(program);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        if let UniformValue::Sampler(unit) = value {
            // One texture unit: the bound texture feeds every texture binding.
            tracing::trace!(unit, "sampler uniform ignored");
            return;
        }
        let buffer = self
            .program
            .and_then(|id| self.programs.get(&id))
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.uniform_buffers.get(&location.0));
        let Some(buffer) = buffer else {
            tracing::warn!(location = location.0, "no uniform buffer at location");
            return;
        };
        let bytes = uniform_bytes(value);
        if bytes.len() as u64 > buffer.size() {
            tracing::warn!(location = location.0, "uniform value larger than its buffer");
            return;
        }
        self.queue.write_buffer(buffer, 0, &bytes);
    }

    fn create_texture(&mut self) -> TextureId {
        let id = TextureId(self.next_id());
        self.textures.insert(id, TextureObject::default());
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        if self.texture == Some(texture) {
            self.texture = None;
        }
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.texture = Some(texture);
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, rgba: Option<&[u8]>) {
        if width == 0 || height == 0 {
            tracing::warn!(width, height, "empty texture image ignored");
            return;
        }
        let Some(object) = self.texture.and_then(|id| self.textures.get_mut(&id)) else {
            tracing::warn!("tex_image_2d with no texture bound");
            return;
        };
        let storage = create_storage(&self.device, width, height, "texture");
        if let Some(rgba) = rgba {
            if rgba.len() == width as usize * height as usize * 4 {
                self.queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &storage.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    rgba,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(4 * width),
                        rows_per_image: Some(height),
                    },
                    storage.texture.size(),
                );
            } else {
                tracing::warn!(width, height, len = rgba.len(), "texture data size mismatch");
            }
        }
        object.storage = Some(storage);
    }

    fn texture_parameters(&mut self, filter: TextureFilter, wrap: TextureWrap) {
        let Some(object) = self.texture.and_then(|id| self.textures.get_mut(&id)) else {
            return;
        };
        object.sampler = Some(create_sampler(&self.device, filter, wrap));
    }

    fn create_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId(self.next_id());
        self.framebuffers.insert(id, None);
        id
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.framebuffer = framebuffer;
    }

    fn framebuffer_texture(&mut self, texture: TextureId) {
        let Some(attachment) = self
            .framebuffer
            .and_then(|id| self.framebuffers.get_mut(&id))
        else {
            tracing::warn!("framebuffer_texture with the default target bound");
            return;
        };
        *attachment = Some(texture);
    }

    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId(self.next_id());
        self.buffers.insert(id, BufferObject::default());
        id
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        match target {
            BufferTarget::Array => self.array_buffer = Some(buffer),
            BufferTarget::ElementArray => self.element_buffer = Some(buffer),
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let Some(object) = self
            .bound_buffer(target)
            .and_then(|id| self.buffers.get_mut(&id))
        else {
            tracing::warn!(?target, "buffer_data with no buffer bound");
            return;
        };
        let kind = match target {
            BufferTarget::Array => wgpu::BufferUsages::VERTEX,
            BufferTarget::ElementArray => wgpu::BufferUsages::INDEX,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(match target {
                    BufferTarget::Array => "vertex_buffer",
                    BufferTarget::ElementArray => "index_buffer",
                }),
                contents: &pad_to_copy_alignment(data),
                usage: kind | wgpu::BufferUsages::COPY_DST,
            });
        tracing::trace!(?target, ?usage, len = data.len(), "buffer allocated");
        object.buffer = Some(buffer);
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        let Some(buffer) = self
            .bound_buffer(target)
            .and_then(|id| self.buffers.get(&id))
            .and_then(|b| b.buffer.as_ref())
        else {
            tracing::warn!(?target, "buffer_sub_data with no allocated buffer bound");
            return;
        };
        let offset = offset as u64;
        let padded = pad_to_copy_alignment(data);
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0
            || offset + padded.len() as u64 > buffer.size()
        {
            tracing::warn!(?target, offset, len = data.len(), "buffer_sub_data out of range");
            return;
        }
        self.queue.write_buffer(buffer, offset, &padded);
    }

    fn enable_vertex_attribute(&mut self, location: u32) {
        self.enabled_attributes.insert(location);
    }

    fn vertex_attribute_pointer(
        &mut self,
        location: u32,
        components: u32,
        stride: u32,
        offset: u32,
    ) {
        self.attribute_pointers.insert(
            location,
            AttributePointer {
                components,
                stride,
                offset,
            },
        );
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
    }

    fn enable_alpha_blending(&mut self) {
        self.blend = true;
    }

    fn clear(&mut self, color: [f32; 4]) {
        let Some((view, ..)) = self.target() else {
            tracing::trace!("clear skipped: no render target");
            return;
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear_encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(color[0]),
                            g: f64::from(color[1]),
                            b: f64::from(color[2]),
                            a: f64::from(color[3]),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_elements(&mut self, count: u32, offset: u32) {
        if count == 0 {
            return;
        }
        let Some(program) = self.program else {
            tracing::warn!("draw with no program in use");
            return;
        };
        let Some((_, format, width, height)) = self.target() else {
            tracing::trace!("draw skipped: no render target");
            return;
        };
        let Some(linked) = self.programs.get(&program).and_then(|p| p.linked.as_ref()) else {
            tracing::warn!(program = program.0, "draw with an unlinked program");
            return;
        };
        let Some(key) = self.pipeline_key(linked, format) else {
            return;
        };

        if let Some(linked) = self
            .programs
            .get_mut(&program)
            .and_then(|p| p.linked.as_mut())
        {
            if !linked.pipelines.contains_key(&key) {
                tracing::debug!(program = program.0, ?format, blend = key.blend, "pipeline built");
                let pipeline = Self::create_pipeline(&self.device, linked, &key);
                linked.pipelines.insert(key.clone(), pipeline);
            }
        }

        let Some(linked) = self.programs.get(&program).and_then(|p| p.linked.as_ref()) else {
            return;
        };
        let Some(pipeline) = linked.pipelines.get(&key) else {
            return;
        };
        let vertices = self
            .array_buffer
            .and_then(|id| self.buffers.get(&id))
            .and_then(|b| b.buffer.as_ref());
        let indices = self
            .element_buffer
            .and_then(|id| self.buffers.get(&id))
            .and_then(|b| b.buffer.as_ref());
        let (Some(vertices), Some(indices)) = (vertices, indices) else {
            tracing::warn!("draw with no vertex or index buffer");
            return;
        };
        let Some((x, y, w, h)) = clip_viewport(self.viewport, width, height) else {
            tracing::trace!("draw skipped: empty viewport");
            return;
        };
        let Some((view, ..)) = self.target() else {
            return;
        };
        let bind_group = self.bind_group(linked);
        let first = offset / 2;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("draw_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("draw_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
            pass.set_vertex_buffer(0, vertices.slice(..));
            pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(first..first + count, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_formats_follow_component_count() {
        assert_eq!(float_format(2), wgpu::VertexFormat::Float32x2);
        assert_eq!(float_format(3), wgpu::VertexFormat::Float32x3);
        assert_eq!(float_format(4), wgpu::VertexFormat::Float32x4);
    }

    #[test]
    fn mat3_uniform_is_column_padded() {
        let m = UniformValue::Mat3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let bytes = uniform_bytes(&m);
        assert_eq!(bytes.len(), 48);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(&floats[4..8], &[4.0, 5.0, 6.0, 0.0]);
        assert_eq!(uniform_bytes(&UniformValue::Float(1.0)).len(), 4);
    }

    #[test]
    fn copies_are_padded_to_four_bytes() {
        assert_eq!(pad_to_copy_alignment(&[1, 2, 3]), vec![1, 2, 3, 0]);
        assert_eq!(pad_to_copy_alignment(&[]).len(), 4);
        assert_eq!(pad_to_copy_alignment(&[0; 28]).len(), 28);
    }

    #[test]
    fn viewport_is_clipped_and_flipped() {
        assert_eq!(clip_viewport((0, 0, 640, 400), 640, 400), Some((0, 0, 640, 400)));
        // Larger than the target.
        assert_eq!(clip_viewport((0, 0, 800, 600), 640, 400), Some((0, 0, 640, 400)));
        // Bottom-left quarter ends up at the bottom in top-left coordinates.
        assert_eq!(clip_viewport((0, 0, 320, 200), 640, 400), Some((0, 200, 320, 200)));
        assert_eq!(clip_viewport((-10, 0, 10, 10), 640, 400), None);
        assert_eq!(clip_viewport((0, 0, 0, 0), 640, 400), None);
    }
}
