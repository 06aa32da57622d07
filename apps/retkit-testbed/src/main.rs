use anyhow::{Context, Result};
use clap::Parser;
use retkit_game::{GameConfig, ShaderSources, Testbed};
use retkit_input::MouseButton;
use retkit_kernel::{Clock, FixedStepScheduler, MonotonicClock};
use retkit_render::ImageData;
use retkit_render_wgpu::{SPRITE_FRAGMENT_WGSL, SPRITE_VERTEX_WGSL, WgpuBackend};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

mod atlas;

#[derive(Parser)]
#[command(name = "retkit-testbed", about = "Retkit testbed scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Physical pixels per canvas pixel
    #[arg(long)]
    scale: Option<u32>,

    /// Sprite atlas PNG
    #[arg(long, default_value = "png/atlas.png")]
    atlas: PathBuf,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Everything that exists once the window does.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    testbed: Testbed<WgpuBackend>,
}

struct App {
    config: GameConfig,
    atlas: Option<Receiver<ImageData>>,
    scheduler: FixedStepScheduler,
    clock: MonotonicClock,
    gpu: Option<Gpu>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: GameConfig, atlas: Receiver<ImageData>) -> Result<Self> {
        Ok(Self {
            scheduler: FixedStepScheduler::new(config.scheduler)?,
            config,
            atlas: Some(atlas),
            clock: MonotonicClock::new(),
            gpu: None,
            error: None,
        })
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let (width, height) = self.config.viewport();
        let attrs = Window::default_attributes()
            .with_title("Retkit Testbed")
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no GPU adapter can present to this window")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("retkit_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        // Atlas colors are written as-is, like a plain RGBA canvas.
        let surface_format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            format = ?surface_format,
            "GPU initialized"
        );

        let backend = WgpuBackend::new(device, queue, surface_format);
        let atlas = self.atlas.take().context("testbed already initialized")?;
        let mut testbed = Testbed::new(
            self.config,
            backend,
            ShaderSources {
                vertex: SPRITE_VERTEX_WGSL,
                fragment: SPRITE_FRAGMENT_WGSL,
            },
            atlas,
        )?;
        testbed
            .renderer_mut()
            .resize_viewport(surface_config.width, surface_config.height);

        Ok(Gpu {
            window,
            surface,
            surface_config,
            testbed,
        })
    }
}

fn button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Back => Some(MouseButton::Back),
        winit::event::MouseButton::Forward => Some(MouseButton::Forward),
        winit::event::MouseButton::Other(_) => None,
    }
}

fn set_captured(gpu: &mut Gpu, captured: bool) {
    if captured {
        let grabbed = gpu
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| gpu.window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(error) = grabbed {
            tracing::warn!(%error, "cursor grab unavailable");
        }
    } else if let Err(error) = gpu.window.set_cursor_grab(CursorGrabMode::None) {
        tracing::warn!(%error, "cursor release failed");
    }
    gpu.window.set_cursor_visible(!captured);
    gpu.testbed.input_mut().set_focused(captured);
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => {
                self.scheduler.start(self.clock.now());
                gpu.window.request_redraw();
                self.gpu = Some(gpu);
            }
            Err(error) => {
                tracing::error!(%error, "testbed startup failed");
                self.error = Some(error);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.surface_config.width = new_size.width.max(1);
                gpu.surface_config.height = new_size.height.max(1);
                let device = gpu.testbed.renderer().backend().device();
                gpu.surface.configure(device, &gpu.surface_config);
                gpu.testbed
                    .renderer_mut()
                    .resize_viewport(gpu.surface_config.width, gpu.surface_config.height);
            }
            WindowEvent::Focused(false) => set_captured(gpu, false),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if key == KeyCode::Escape && state == ElementState::Pressed {
                    set_captured(gpu, false);
                    return;
                }
                let name = format!("{key:?}");
                match state {
                    ElementState::Pressed => gpu.testbed.input_mut().key_down(&name),
                    ElementState::Released => gpu.testbed.input_mut().key_up(&name),
                }
            }
            WindowEvent::MouseInput { button: b, state, .. } => {
                let Some(b) = button(b) else {
                    return;
                };
                match state {
                    ElementState::Pressed => {
                        if gpu.testbed.input_mut().mouse_down(b) {
                            set_captured(gpu, true);
                        }
                    }
                    ElementState::Released => gpu.testbed.input_mut().mouse_up(b),
                }
            }
            WindowEvent::RedrawRequested => {
                let frame = match gpu.surface.get_current_texture() {
                    Ok(frame) => frame,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let device = gpu.testbed.renderer().backend().device();
                        gpu.surface.configure(device, &gpu.surface_config);
                        gpu.window.request_redraw();
                        return;
                    }
                    Err(error) => {
                        tracing::error!(%error, "surface error");
                        gpu.window.request_redraw();
                        return;
                    }
                };

                gpu.testbed.renderer_mut().backend_mut().begin_frame(frame);
                let report = self.scheduler.frame_with(&self.clock, &mut gpu.testbed);
                gpu.testbed.renderer_mut().backend_mut().present_frame();
                tracing::trace!(steps = report.steps, frame_time = report.frame_time, "frame");

                gpu.window.request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let (DeviceEvent::MouseMotion { delta }, Some(gpu)) = (event, &mut self.gpu) {
            gpu.testbed
                .input_mut()
                .mouse_moved(delta.0 as f32, delta.1 as f32);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(scale) = cli.scale {
        config.scale = scale;
    }
    config.validate()?;

    tracing::info!(atlas = %cli.atlas.display(), "retkit-testbed starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, atlas::load_async(cli.atlas))?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
