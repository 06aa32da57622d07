use anyhow::Context;
use clap::{Parser, Subcommand};
use retkit_game::{GameConfig, Testbed, glsl_shaders};
use retkit_kernel::FixedStepScheduler;
use retkit_render::{ImageData, RecordingBackend};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retkit-cli", about = "Headless tools for the retkit engine core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Run the testbed scene against a recording backend with a synthetic clock
    Simulate {
        /// Number of host frames
        #[arg(short, long, default_value = "600")]
        frames: u32,
        /// Milliseconds between host frames
        #[arg(long, default_value = "16.667")]
        frame_ms: f64,
        /// Frame after which the host stalls
        #[arg(long)]
        stall_at: Option<u32>,
        /// Length of the stall in seconds
        #[arg(long, default_value = "1.0")]
        stall_secs: f64,
        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("retkit-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", retkit_common::crate_info());
            println!("kernel: {}", retkit_kernel::crate_info());
            println!("input: {}", retkit_input::crate_info());
            println!("render: {}", retkit_render::crate_info());
            println!("render-wgpu: {}", retkit_render_wgpu::crate_info());
            println!("game: {}", retkit_game::crate_info());
        }
        Commands::Simulate {
            frames,
            frame_ms,
            stall_at,
            stall_secs,
            config,
        } => {
            anyhow::ensure!(
                frame_ms.is_finite() && frame_ms >= 0.0,
                "frame interval must be a non-negative number of milliseconds"
            );
            let config = match config {
                Some(path) => GameConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => GameConfig::default(),
            };

            let mut testbed = Testbed::new(
                config,
                RecordingBackend::new(),
                glsl_shaders(),
                Some(ImageData::filled(64, 64, [255; 4])),
            )?;
            let mut scheduler = FixedStepScheduler::new(config.scheduler)?;
            tracing::info!(frames, frame_ms, ?stall_at, "simulation starting");

            println!(
                "Simulating {frames} frames at {frame_ms} ms (fixed step {} s)",
                config.scheduler.fixed_delta
            );

            let mut now = 0.0;
            let mut most_steps = 0;
            scheduler.start(now);
            for frame in 1..=frames {
                now += frame_ms / 1000.0;
                if stall_at == Some(frame) {
                    now += stall_secs;
                    tracing::warn!(frame, stall_secs, "host stall injected");
                    println!("Stall: +{stall_secs} s before frame {frame}");
                }
                let report = scheduler.frame(now, &mut testbed);
                most_steps = most_steps.max(report.steps);
            }

            let stats = testbed.stats();
            tracing::info!(
                steps = stats.steps,
                renders = stats.renders,
                tick = testbed.world().tick(),
                "simulation finished"
            );
            let binds = testbed.renderer().bind_stats();
            let backend = testbed.renderer().backend();
            println!(
                "Steps: {} (most in one frame: {most_steps}, sim time {:.3} s)",
                stats.steps,
                scheduler.sim_time()
            );
            println!(
                "Renders: {}, draw calls: {}, dropped sprites: {}",
                stats.renders,
                backend.draw_calls(),
                stats.dropped_sprites
            );
            println!(
                "Binds: textures {}/{} programs {}/{} framebuffers {}/{} (issued/elided)",
                binds.textures.issued,
                binds.textures.elided,
                binds.programs.issued,
                binds.programs.elided,
                binds.framebuffers.issued,
                binds.framebuffers.elided,
            );
            if let Some(position) = testbed.player_position() {
                println!("Player: ({:.3}, {:.3})", position.x, position.y);
            }
            println!(
                "World: tick={}, hash={:#018x}",
                testbed.world().tick(),
                testbed.world().state_hash()
            );
        }
    }

    Ok(())
}
