use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info, trace};
use particle_arena::Simulation;
use particle_arena_common::SimulationConfig;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Command-line arguments for the headless frame driver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config.toml file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of frames to run (overrides run.frames)
    #[arg(short, long)]
    frames: Option<u32>,

    /// RNG seed (overrides run.seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Pace frames at run.frame_interval_ms instead of running flat out
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    // Initialize the logger; RUST_LOG overrides the default level.
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Starting particle arena...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    let total_frames = args.frames.unwrap_or(config.run.frames);
    let status_interval = config.run.status_interval.max(1) as u64;
    let tick = Duration::from_millis(config.run.frame_interval_ms);

    // --- Initialize Simulation ---
    let mut sim = Simulation::new(config)?;
    debug!("Simulation Parameters: {:#?}", sim.params());

    info!(
        "Running {} frames of {} substeps (dt = {})",
        total_frames,
        sim.params().cycles,
        sim.params().dt
    );
    let start_time = Instant::now();
    let mut next_tick = Instant::now();

    for _ in 0..total_frames {
        let status = sim.advance_frame();

        if status.frame % status_interval == 0 {
            if status.lost > 0 {
                info!(
                    "Frames: {} | Calculation time per frame: {:.2} ms | Live: {} | Lost particles: {}",
                    status.frame,
                    status.compute_time.as_secs_f64() * 1000.0,
                    status.live,
                    status.lost
                );
            } else {
                info!(
                    "Frames: {} | Calculation time per frame: {:.2} ms | Live: {}",
                    status.frame,
                    status.compute_time.as_secs_f64() * 1000.0,
                    status.live
                );
            }
        } else {
            trace!(
                "Frame {} completed in {:.2} ms",
                status.frame,
                status.compute_time.as_secs_f64() * 1000.0
            );
        }

        // The renderer would draw this once per frame.
        let snapshot = sim.snapshot();
        trace!(
            "Frame {}: {} particles, {} segments to draw",
            snapshot.frame,
            snapshot.particles.len(),
            snapshot.segments.len()
        );

        if args.realtime {
            next_tick += tick;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            } else {
                // Fell behind; don't try to catch up.
                next_tick = now;
            }
        }
    }

    let total_duration = start_time.elapsed();
    info!(
        "Finished {} frames in {:.3} s | Live: {} | Lost: {}",
        sim.frame(),
        total_duration.as_secs_f64(),
        sim.live_count(),
        sim.lost()
    );
    Ok(())
}
