//! # swarmslam
//!
//! Multi-agent exploration on a static occupancy grid: reactive
//! potential-field navigation plus a confidence-decay obstacle map.
//!
//! ## Structure
//!
//! ```text
//! swarmslam/
//! ── algorithms/     # Grid, ray casting, confidence map, navigation
//! ── agent/          # Agent state, status machine, motion integrator
//! ── simulation/     # Tick loop, spawning, per-tick statistics
//! ── config.rs       # Serde configuration (YAML/TOML)
//! ── error.rs        # SwarmError
//! ── tools/          # swarmsim headless runner
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use swarmslam::prelude::*;
//!
//! let mut config = SimulationConfig::default();
//! config.environment.size = 60;
//! config.run.total_ticks = 20;
//! config.run.seed = Some(11);
//!
//! let mut sim = Simulation::new(config)?;
//! let history = sim.run();
//!
//! assert_eq!(history.len(), 20);
//! for agent in sim.snapshots() {
//!     println!("agent {} at ({:.1}, {:.1}) {:?}", agent.id, agent.position.x, agent.position.y, agent.status);
//! }
//! # Ok::<(), swarmslam::SwarmError>(())
//! ```

pub mod agent;
pub mod algorithms;
pub mod config;
pub mod error;
pub mod simulation;

pub use agent::{Agent, AgentSnapshot, AgentStatus, MoveOutcome, Neighbor};
pub use config::SimulationConfig;
pub use error::{SwarmError, SwarmResult};
pub use simulation::{Simulation, SimulationState, StepStats};

/// Common imports
pub mod prelude {
    pub use crate::agent::{Agent, AgentSnapshot, AgentStatus, MoveOutcome, Neighbor};
    pub use crate::algorithms::{
        ConfidenceMap, Decision, EnvironmentAssessment, Grid, GridCoord, SensorReading,
    };
    pub use crate::config::{
        AgentConfig, EnvironmentConfig, EnvironmentLayout, MappingConfig, PerformancePrediction,
        RunConfig, SensorConfig, SimulationConfig,
    };
    pub use crate::error::{SwarmError, SwarmResult};
    pub use crate::simulation::{Simulation, StepStats};
}
