//! swarmsim - headless multi-agent exploration runner

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use swarmsim::metrics::RunMetrics;
use swarmsim::recorder::Recorder;
use swarmslam::config::{EnvironmentLayout, SimulationConfig};
use swarmslam::simulation::Simulation;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Parser)]
#[command(name = "swarmsim")]
#[command(about = "Headless multi-agent exploration with a shared confidence map")]
struct Args {
    /// Simulation configuration file (YAML, TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long)]
    ticks: Option<u64>,

    /// RNG seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of agents
    #[arg(long)]
    agents: Option<usize>,

    /// Grid side length in cells
    #[arg(long)]
    grid_size: Option<usize>,

    /// Environment layout (random, maze, office, warehouse, outdoor)
    #[arg(long)]
    layout: Option<EnvironmentLayout>,

    /// Pacing multiplier applied with --realtime
    #[arg(long)]
    speed_multiplier: Option<f64>,

    /// Sleep between ticks instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Log progress every N ticks (defaults to run.visualization_steps)
    #[arg(long)]
    log_every: Option<u64>,

    /// Write run metrics to this CSV file
    #[arg(long)]
    export_csv: Option<PathBuf>,

    /// Write run metrics to this JSON file
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Record agent frames to this file (JSON, or YAML by extension)
    #[arg(long)]
    record: Option<PathBuf>,

    /// Ticks between recorded frames
    #[arg(long, default_value = "5")]
    record_every: u64,
}

impl Args {
    fn build_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => SimulationConfig::default(),
        };

        if let Some(ticks) = self.ticks {
            config.run.total_ticks = ticks;
        }
        if let Some(seed) = self.seed {
            config.run.seed = Some(seed);
        }
        if let Some(agents) = self.agents {
            config.agents.count = agents;
        }
        if let Some(size) = self.grid_size {
            config.environment.size = size;
        }
        if let Some(layout) = self.layout {
            config.environment.layout = layout;
        }
        if let Some(multiplier) = self.speed_multiplier {
            config.run.speed_multiplier = multiplier;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.build_config()?;

    let assessment = config.environment.assess();
    info!(
        "Environment: {} layout, difficulty {:?} (coverage {:.2}, path complexity {:.2})",
        config.environment.layout,
        assessment.difficulty,
        assessment.obstacle_coverage,
        assessment.path_complexity
    );
    let prediction = config.predict_performance();
    info!(
        "Predicted: exploration efficiency {:.1}%, collision risk {:.1}%, mapping accuracy {:.1}%",
        prediction.exploration_efficiency, prediction.collision_risk, prediction.mapping_accuracy
    );

    let mut sim = Simulation::new(config.clone()).context("Invalid simulation configuration")?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set signal handler: {}", e);
    }

    let run_name = format!("{}-{}", config.environment.layout, sim.seed());
    let mut metrics =
        RunMetrics::new(&run_name, "swarmsim headless run").with_config(&config, sim.seed());
    let mut recorder = args
        .record
        .as_ref()
        .map(|_| Recorder::new(&run_name, &sim, args.record_every));

    let interval = Duration::from_millis(config.run.base_interval_ms)
        .div_f64(config.run.speed_multiplier.max(f64::EPSILON));
    let log_every = args
        .log_every
        .unwrap_or(config.run.visualization_steps)
        .max(1);

    info!(
        "Running {} ticks with {} agents (seed {})",
        config.run.total_ticks,
        sim.agents().len(),
        sim.seed()
    );

    while !sim.is_finished() {
        if !running.load(Ordering::SeqCst) {
            warn!("Interrupted at tick {}; exporting partial results", sim.tick());
            break;
        }

        let Some(stats) = sim.step() else {
            break;
        };

        metrics.record(&stats);
        if let Some(recorder) = recorder.as_mut() {
            recorder.capture(&sim, &stats);
        }

        if stats.tick % log_every == 0 {
            info!(
                "tick {}: exploration {:.1}%, map {:.1}%, collisions {}, stuck {}",
                stats.tick,
                stats.exploration_rate * 100.0,
                stats.map_coverage * 100.0,
                stats.total_collisions,
                stats.stuck_agents
            );
        }

        if args.realtime {
            std::thread::sleep(interval);
        }
    }

    info!(
        "Finished after {} ticks: exploration {:.1}%, efficiency {:.2}",
        metrics.ticks,
        metrics.exploration_rate * 100.0,
        metrics.efficiency()
    );

    if let Some(path) = &args.export_csv {
        metrics.export_to_csv(path)?;
        info!("Metrics written to {:?}", path);
    }
    if let Some(path) = &args.export_json {
        metrics.export_to_json(path)?;
        info!("Metrics written to {:?}", path);
    }
    if let (Some(path), Some(recorder)) = (&args.record, recorder) {
        let frames = recorder.frame_count();
        recorder.finish().save_to_file(path)?;
        info!("Recorded {} frames to {:?}", frames, path);
    }

    println!("Recommendations:");
    for recommendation in metrics.recommendations() {
        println!("  - {}", recommendation);
    }

    Ok(())
}
