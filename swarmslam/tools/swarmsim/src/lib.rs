//! # swarmsim - headless runner for swarmslam
//!
//! The binary drives a [`swarmslam::Simulation`] to completion and writes
//! the results to disk. The library half exposes the pieces it uses so they
//! can be reused from tests or other tools.
//!
//! ## Binary Usage
//! ```bash
//! swarmsim --layout maze --agents 4 --ticks 800 --export-csv run.csv
//! swarmsim --config swarm.yaml --record frames.json --record-every 5
//! ```
//!
//! ## Library Usage
//! ```rust,no_run
//! use swarmsim::metrics::RunMetrics;
//! use swarmslam::prelude::*;
//!
//! let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
//! let mut metrics = RunMetrics::new("default", "stock settings");
//! for stats in sim.run() {
//!     metrics.record(&stats);
//! }
//! metrics.export_to_csv(std::path::Path::new("run.csv")).unwrap();
//! ```

// Run metrics and post-run analysis
pub mod metrics;

// Frame recording
pub mod recorder;
