use glam::Vec2;
use retkit_common::{EntityId, pixel_projection};
use retkit_input::{InputCollector, InputSnapshot};
use retkit_kernel::{FixedStep, World};
use retkit_render::{
    Batch, BatchError, ImageSource, Program, ProgramError, RasterBackend, Renderer, Texture,
    UniformError,
};
use thiserror::Error;

use crate::config::{ConfigError, GameConfig};
use crate::scene;

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Error)]
pub enum TestbedError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("sprite program: {0}")]
    Program(#[from] ProgramError),
    #[error("sprite program uniform: {0}")]
    Uniform(#[from] UniformError),
    #[error("sprite batch: {0}")]
    Batch(#[from] BatchError),
}

/// Vertex and fragment source for the backend in use.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSources<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// Counters over the testbed's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestbedStats {
    pub steps: u64,
    pub renders: u64,
    /// Sprites dropped because the batch was full.
    pub dropped_sprites: u64,
}

/// The reference scene: simulation, input and rendering in one
/// [`FixedStep`] driven by a [`retkit_kernel::FixedStepScheduler`].
pub struct Testbed<B: RasterBackend> {
    config: GameConfig,
    world: World,
    input: InputCollector,
    snapshot: InputSnapshot,
    renderer: Renderer<B>,
    program: Program,
    atlas: Texture,
    batch: Batch,
    stats: TestbedStats,
}

impl<B: RasterBackend> Testbed<B> {
    /// Build the scene and its GPU resources. The atlas is uploaded by the
    /// first render after `atlas` reports ready.
    pub fn new(
        config: GameConfig,
        backend: B,
        shaders: ShaderSources<'_>,
        atlas: impl ImageSource + Send + 'static,
    ) -> Result<Self, TestbedError> {
        config.validate()?;
        let (viewport_width, viewport_height) = config.viewport();
        let mut renderer = Renderer::new(backend, viewport_width, viewport_height);

        let program = renderer.build_program(shaders.vertex, shaders.fragment)?;
        renderer.set_uniform_by_name(
            &program,
            "u_Matrix",
            pixel_projection(config.width as f32, config.height as f32),
        )?;
        renderer.enable_alpha_blending();

        let atlas = renderer.build_texture(atlas);
        let batch = renderer.build_batch(config.batch_capacity)?;

        tracing::info!(
            width = config.width,
            height = config.height,
            scale = config.scale,
            capacity = config.batch_capacity,
            "testbed ready"
        );

        Ok(Self {
            input: InputCollector::new(config.width, config.height, config.scale),
            snapshot: InputSnapshot::default(),
            world: scene::build_world(),
            config,
            renderer,
            program,
            atlas,
            batch,
            stats: TestbedStats::default(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn player(&self) -> EntityId {
        scene::PLAYER
    }

    pub fn player_position(&self) -> Option<Vec2> {
        self.world
            .get(scene::PLAYER)
            .map(|entity| entity.collider.position)
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    /// Host event sink. Events reach the scene on the next step.
    pub fn input_mut(&mut self) -> &mut InputCollector {
        &mut self.input
    }

    /// Input as seen by the last step.
    pub fn snapshot(&self) -> &InputSnapshot {
        &self.snapshot
    }

    pub fn atlas(&self) -> &Texture {
        &self.atlas
    }

    pub fn stats(&self) -> TestbedStats {
        self.stats
    }
}

impl<B: RasterBackend> FixedStep for Testbed<B> {
    fn update(&mut self, time: f64, _delta: f64) {
        self.snapshot = self.input.process();

        let nudge = Vec2::new(
            self.snapshot.axis("ArrowLeft", "ArrowRight") as f32,
            self.snapshot.axis("ArrowUp", "ArrowDown") as f32,
        ) * scene::NUDGE;
        let motion = scene::player_motion(time) + nudge;

        match self.world.move_entity(scene::PLAYER, motion) {
            Ok(applied) => tracing::trace!(time, ?motion, ?applied, "player moved"),
            Err(error) => tracing::warn!(%error, "player missing from world"),
        }
        if let Some(sprite) = self
            .world
            .get_mut(scene::PLAYER)
            .and_then(|player| player.sprite.as_mut())
        {
            sprite.texel_origin.x = scene::animation_offset(time);
        }

        self.world.step();
        self.stats.steps += 1;
    }

    fn render(&mut self) {
        let _span = tracing::info_span!("render", tick = self.world.tick()).entered();

        self.renderer.refresh_texture(&mut self.atlas);
        self.renderer.clear(CLEAR_COLOR);

        let mut dropped = 0u64;
        for sprite in self.world.sprites() {
            if self.batch.push_sprite(sprite).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::warn!(
                dropped,
                capacity = self.batch.capacity(),
                "batch full, sprites dropped this frame"
            );
            self.stats.dropped_sprites += dropped;
        }

        self.renderer.flush_batch(&mut self.batch);
        self.renderer
            .draw_batch(&self.batch, &self.program, None, self.atlas.id());
        self.stats.renders += 1;
    }
}
