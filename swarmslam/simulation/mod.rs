//! Tick-driven multi-agent simulation
//!
//! [`Simulation`] owns the whole run: environment, agents, confidence map and
//! the seeded RNG. One call to [`Simulation::step`] is one tick:
//!
//! 1. the shared map forgets (global decay, once per tick)
//! 2. each agent in order: status update, sensing, decision, move, map update
//!
//! Agents update sequentially, so later agents see the moved positions of
//! earlier ones within the same tick.
//!
//! # Example
//!
//! ```rust
//! use swarmslam::config::SimulationConfig;
//! use swarmslam::simulation::Simulation;
//!
//! let mut config = SimulationConfig::default();
//! config.environment.size = 60;
//! config.run.seed = Some(3);
//!
//! let mut sim = Simulation::new(config).unwrap();
//! let stats = sim.step().unwrap();
//! assert_eq!(stats.tick, 1);
//! ```

pub mod stats;

pub use stats::{exploration_rate, StepStats, MAP_COVERAGE_THRESHOLD};

use crate::agent::{Agent, AgentSnapshot, MoveOutcome, Neighbor};
use crate::algorithms::confidence_map::ConfidenceMap;
use crate::algorithms::navigation::decide;
use crate::algorithms::occupancy_grid::{generate_environment, Grid};
use crate::algorithms::raycast::sense;
use crate::config::{AgentConfig, SimulationConfig};
use crate::error::{SwarmError, SwarmResult};
use nalgebra::Point2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::TAU;
use tracing::{debug, info, warn};

/// Agents spawn at least this far from the grid edge
const SPAWN_EDGE_OFFSET: usize = 10;

/// Everything that changes over a run
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub tick: u64,
    pub grid: Grid,
    pub map: ConfidenceMap,
    pub agents: Vec<Agent>,
    pub total_collisions: u64,
    pub last_stats: Option<StepStats>,
}

impl SimulationState {
    fn new(grid: Grid, agents: Vec<Agent>) -> Self {
        let map = ConfidenceMap::new(grid.size());
        Self {
            tick: 0,
            grid,
            map,
            agents,
            total_collisions: 0,
            last_stats: None,
        }
    }
}

/// Simulation controller
pub struct Simulation {
    config: SimulationConfig,
    state: SimulationState,
    rng: ChaCha8Rng,
    seed: u64,
    paused: bool,
}

impl Simulation {
    /// Validate `config`, generate the environment and spawn agents
    pub fn new(config: SimulationConfig) -> SwarmResult<Self> {
        config.validate()?;

        let seed = config.run.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = build_state(&config, &mut rng);

        info!(
            "Simulation initialized: {} agents on a {}x{} {} grid (seed {})",
            state.agents.len(),
            config.environment.size,
            config.environment.size,
            config.environment.layout,
            seed
        );

        Ok(Self {
            config,
            state,
            rng,
            seed,
            paused: false,
        })
    }

    /// Build a simulation around a prepared grid and agents
    pub fn from_parts(
        config: SimulationConfig,
        grid: Grid,
        agents: Vec<Agent>,
        seed: u64,
    ) -> SwarmResult<Self> {
        config.validate()?;
        if grid.size() == 0 {
            return Err(SwarmError::InvalidConfig("grid is empty".to_string()));
        }

        Ok(Self {
            config,
            state: SimulationState::new(grid, agents),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            paused: false,
        })
    }

    /// Regenerate environment and agents from the run seed
    pub fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.state = build_state(&self.config, &mut self.rng);
        self.paused = false;
        info!("Simulation reset (seed {})", self.seed);
    }

    /// Advance one tick; `None` while paused
    pub fn step(&mut self) -> Option<StepStats> {
        if self.paused {
            return None;
        }

        let config = &self.config;
        let SimulationState {
            tick,
            grid,
            map,
            agents,
            total_collisions,
            last_stats,
        } = &mut self.state;

        let sensor = &config.sensor;
        let mapping = &config.mapping;

        map.decay(mapping.decay_factor);

        let mut collisions = 0;
        for i in 0..agents.len() {
            let others: Vec<Neighbor> = agents
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, agent)| Neighbor::from(agent))
                .collect();
            let agent = &mut agents[i];

            if let Some(change) = agent.update_status(&config.agents.stuck) {
                debug!(
                    "tick {}: agent {} {} -> {}",
                    *tick,
                    agent.id,
                    change.from.as_str(),
                    change.to.as_str()
                );
            }

            let origin = agent.position;
            let readings = sense(grid, &origin, agent.heading, sensor.range, sensor.count);
            let decision = decide(
                agent,
                &readings,
                &others,
                grid,
                sensor.range,
                &config.agents,
                &mut self.rng,
            );

            let outcome = agent.drive(
                decision.linear_speed,
                decision.turn_angle,
                grid,
                &others,
                &config.agents,
            );
            if outcome == MoveOutcome::Blocked {
                collisions += 1;
            }

            agent.mark_visited(mapping.exploration_cell_size);
            map.integrate(&origin, &readings, sensor.range, mapping.confidence_threshold);
        }

        *tick += 1;
        *total_collisions += collisions as u64;

        let stats = StepStats::compute(
            *tick,
            agents,
            map,
            collisions,
            *total_collisions,
            mapping.exploration_cell_size,
        );
        *last_stats = Some(stats.clone());
        Some(stats)
    }

    /// Run until `run.total_ticks` ticks have elapsed, or until paused
    pub fn run(&mut self) -> Vec<StepStats> {
        let mut history = Vec::new();
        while self.state.tick < self.config.run.total_ticks {
            match self.step() {
                Some(stats) => history.push(stats),
                None => break,
            }
        }
        history
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// All configured ticks have run
    pub fn is_finished(&self) -> bool {
        self.state.tick >= self.config.run.total_ticks
    }

    pub fn tick(&self) -> u64 {
        self.state.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn grid(&self) -> &Grid {
        &self.state.grid
    }

    pub fn map(&self) -> &ConfidenceMap {
        &self.state.map
    }

    pub fn agents(&self) -> &[Agent] {
        &self.state.agents
    }

    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.state.agents.iter().map(Agent::snapshot).collect()
    }

    /// Statistics of the last completed tick
    pub fn stats(&self) -> Option<&StepStats> {
        self.state.last_stats.as_ref()
    }
}

fn build_state(config: &SimulationConfig, rng: &mut ChaCha8Rng) -> SimulationState {
    let grid = generate_environment(&config.environment, rng);
    let mut agents = spawn_agents(&grid, &config.agents, rng);
    for agent in &mut agents {
        agent.mark_visited(config.mapping.exploration_cell_size);
    }
    SimulationState::new(grid, agents)
}

/// Place `config.count` agents at random collision-free cells
///
/// An agent that cannot be placed within `spawn_attempts` tries is skipped.
pub fn spawn_agents<R: Rng + ?Sized>(grid: &Grid, config: &AgentConfig, rng: &mut R) -> Vec<Agent> {
    let n = grid.size();
    let lo = SPAWN_EDGE_OFFSET;
    let hi = n.saturating_sub(SPAWN_EDGE_OFFSET).max(lo);

    let mut agents: Vec<Agent> = Vec::with_capacity(config.count);
    for slot in 0..config.count {
        let neighbors: Vec<Neighbor> = agents.iter().map(Neighbor::from).collect();
        let id = agents.len();

        let placed = (0..config.spawn_attempts).find_map(|_| {
            let x = rng.gen_range(lo..=hi) as f64;
            let y = rng.gen_range(lo..=hi) as f64;
            let heading = rng.gen_range(0.0..TAU);
            let candidate = Agent::new(id, Point2::new(x, y), heading, config);
            (!candidate.collides_at(&candidate.position, grid, &neighbors)).then_some(candidate)
        });

        match placed {
            Some(agent) => agents.push(agent),
            None => warn!(
                "Could not place agent {} after {} attempts; skipping it",
                slot, config.spawn_attempts
            ),
        }
    }

    agents
}
