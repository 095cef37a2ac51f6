//! Simulation configuration
//!
//! Every parameter the simulation consumes lives here. Configs deserialize from
//! YAML, TOML or JSON (picked by file extension) and fill missing fields with defaults,
//! so a config file only needs to name what it changes:
//!
//! ```yaml
//! environment:
//!   size: 80
//!   layout: warehouse
//! agents:
//!   count: 4
//! run:
//!   seed: 7
//! ```

use crate::algorithms::occupancy_grid::EnvironmentAssessment;
use crate::error::{SwarmError, SwarmResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Smallest grid edge the simulation accepts
pub const MIN_GRID_SIZE: usize = 20;

/// Minimum wall thickness around the grid
pub const MIN_BOUNDARY_THICKNESS: usize = 3;

/// Obstacle arrangement used when generating the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentLayout {
    /// Randomly placed rectangles
    #[default]
    Random,
    /// Horizontal walls with one gap each
    Maze,
    /// Grid of L-shaped rooms with doors
    Office,
    /// Shelf rows separated by aisles
    Warehouse,
    /// Scattered round obstacles
    Outdoor,
}

impl EnvironmentLayout {
    pub const ALL: [EnvironmentLayout; 5] = [
        EnvironmentLayout::Random,
        EnvironmentLayout::Maze,
        EnvironmentLayout::Office,
        EnvironmentLayout::Warehouse,
        EnvironmentLayout::Outdoor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentLayout::Random => "random",
            EnvironmentLayout::Maze => "maze",
            EnvironmentLayout::Office => "office",
            EnvironmentLayout::Warehouse => "warehouse",
            EnvironmentLayout::Outdoor => "outdoor",
        }
    }
}

impl fmt::Display for EnvironmentLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentLayout {
    type Err = SwarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|layout| layout.as_str() == wanted)
            .ok_or_else(|| SwarmError::InvalidConfig(format!("unknown layout '{}'", s)))
    }
}

/// Environment (grid) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Grid edge length in cells
    pub size: usize,
    /// Number of obstacles to place (Random and Outdoor layouts)
    pub obstacle_count: usize,
    /// Largest obstacle edge in cells
    pub max_obstacle_size: usize,
    /// Wall thickness around the grid
    pub boundary_thickness: usize,
    pub layout: EnvironmentLayout,
    /// 1 (sparse) to 10 (dense); ignored by the Random layout
    pub complexity: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            size: 100,
            obstacle_count: 15,
            max_obstacle_size: 8,
            boundary_thickness: MIN_BOUNDARY_THICKNESS,
            layout: EnvironmentLayout::Random,
            complexity: 5,
        }
    }
}

impl EnvironmentConfig {
    /// Estimate how hard this environment is before generating it
    pub fn assess(&self) -> EnvironmentAssessment {
        EnvironmentAssessment::estimate(self.size, self.obstacle_count, self.max_obstacle_size)
    }
}

/// Stuck detection sensitivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckDetectionConfig {
    /// Consecutive low-movement ticks tolerated before the agent counts as stuck
    pub stuck_threshold: u32,
    /// Number of recent positions inspected for variance and path length
    pub window: usize,
    /// Positions retained for detection (>= window)
    pub history_capacity: usize,
    /// Per-axis position variance below which the agent is stuck
    pub variance_threshold: f64,
    /// Per-tick displacement below which a move counts as "no progress"
    pub movement_threshold: f64,
    /// Ticks spent stuck before switching to emergency escape
    pub emergency_after: u32,
    /// stuck_count above which the escape response is amplified
    pub escalation_threshold: u32,
}

impl Default for StuckDetectionConfig {
    fn default() -> Self {
        Self {
            stuck_threshold: 3,
            window: 7,
            history_capacity: 10,
            variance_threshold: 0.15,
            movement_threshold: 0.15,
            emergency_after: 50,
            escalation_threshold: 5,
        }
    }
}

/// Damped integrator and potential-field gains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Fraction of the velocity error corrected per tick
    pub response: f64,
    /// Velocity multiplier applied every tick
    pub damping: f64,
    /// Largest heading change applied by a single move (radians)
    pub max_turn: f64,
    /// Inverse-square repulsion gain between agents
    pub agent_repulsion_gain: f64,
    /// Inverse-square push away from the grid edges
    pub boundary_gain: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            response: 0.3,
            damping: 0.9,
            max_turn: PI * 0.8,
            agent_repulsion_gain: 2.0,
            boundary_gain: 1.0,
        }
    }
}

/// Per-agent configuration (shared by all agents of a run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Number of agents to spawn
    pub count: usize,
    /// Nominal forward speed (cells per tick)
    pub speed: f64,
    /// Clearance radius used for collision checks
    pub safety_distance: f64,
    /// Distance at which avoidance becomes urgent
    pub critical_distance: f64,
    /// Scales every heading correction (0.1 - 1.0)
    pub turn_sensitivity: f64,
    /// Trail length kept for rendering
    pub max_path_length: usize,
    /// Commanded speed is clamped to +/- speed * speed_limit_factor
    pub speed_limit_factor: f64,
    /// Random placements tried before giving up on an agent
    pub spawn_attempts: usize,
    pub stuck: StuckDetectionConfig,
    pub motion: MotionConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            count: 2,
            speed: 3.0,
            safety_distance: 3.0,
            critical_distance: 5.0,
            turn_sensitivity: 0.5,
            max_path_length: 100,
            speed_limit_factor: 2.0,
            spawn_attempts: 100,
            stuck: StuckDetectionConfig::default(),
            motion: MotionConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Range within which obstacles and other agents trigger avoidance
    pub fn detection_distance(&self) -> f64 {
        self.critical_distance * 3.0
    }

    /// Largest commanded speed magnitude
    pub fn speed_limit(&self) -> f64 {
        self.speed * self.speed_limit_factor
    }
}

/// Range sensor fan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Maximum ray length (cells)
    pub range: f64,
    /// Rays spread over the forward half circle
    pub count: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            range: 30.0,
            count: 9,
        }
    }
}

/// Confidence map parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Minimum hit confidence that reinforces the map
    pub confidence_threshold: f64,
    /// Global per-tick forgetting factor, in (0, 1]
    pub decay_factor: f64,
    /// Edge of the coarse cells used for the exploration statistic
    pub exploration_cell_size: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            decay_factor: 0.95,
            exploration_cell_size: 5,
        }
    }
}

/// Run loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub total_ticks: u64,
    /// Pause between ticks in real-time mode (milliseconds)
    pub base_interval_ms: u64,
    /// Divides the pause between ticks
    pub speed_multiplier: f64,
    /// Progress is reported every N ticks
    pub visualization_steps: u64,
    /// RNG seed; a random seed is drawn when absent
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            total_ticks: 500,
            base_interval_ms: 20,
            speed_multiplier: 1.0,
            visualization_steps: 5,
            seed: None,
        }
    }
}

/// Rough outcome estimate derived from the parameters alone (percentages)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformancePrediction {
    /// Sensor reach times speed, capped at 100
    pub exploration_efficiency: f64,
    /// Falls as the clearance margins grow, floored at 0
    pub collision_risk: f64,
    /// Confidence threshold times decay factor
    pub mapping_accuracy: f64,
}

/// Complete simulation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub environment: EnvironmentConfig,
    pub agents: AgentConfig,
    pub sensor: SensorConfig,
    pub mapping: MappingConfig,
    pub run: RunConfig,
}

impl SimulationConfig {
    /// Load a config file, detecting the format from its extension
    pub fn load_from_file(path: impl AsRef<Path>) -> SwarmResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: Self = match extension(path).as_str() {
            "toml" => toml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            // Default to YAML for .yaml, .yml or no extension
            "yaml" | "yml" | "" => serde_yaml::from_str(&content)?,
            other => return Err(SwarmError::UnsupportedFormat(other.to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Save the config, detecting the format from the extension
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> SwarmResult<()> {
        let path = path.as_ref();
        let content = match extension(path).as_str() {
            "toml" => toml::to_string_pretty(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            "yaml" | "yml" | "" => serde_yaml::to_string(self)?,
            other => return Err(SwarmError::UnsupportedFormat(other.to_string())),
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Estimate run performance from the parameters alone
    pub fn predict_performance(&self) -> PerformancePrediction {
        let agents = &self.agents;
        let reach = self.sensor.range * self.sensor.count as f64 * agents.speed;

        PerformancePrediction {
            exploration_efficiency: (reach / 50.0).min(100.0),
            collision_risk: (100.0 - agents.safety_distance * agents.critical_distance * 10.0)
                .max(0.0),
            mapping_accuracy: self.mapping.confidence_threshold * self.mapping.decay_factor * 100.0,
        }
    }

    /// Reject parameter combinations the simulation cannot run with
    pub fn validate(&self) -> SwarmResult<()> {
        let env = &self.environment;
        if env.size < MIN_GRID_SIZE {
            return invalid(format!(
                "grid size {} is below the minimum of {}",
                env.size, MIN_GRID_SIZE
            ));
        }
        if env.boundary_thickness < MIN_BOUNDARY_THICKNESS {
            return invalid(format!(
                "boundary thickness must be at least {}",
                MIN_BOUNDARY_THICKNESS
            ));
        }
        if env.boundary_thickness.saturating_mul(2) >= env.size {
            return invalid("boundary leaves no free interior".to_string());
        }
        if env.max_obstacle_size > env.size {
            return invalid(format!(
                "max obstacle size {} exceeds grid size {}",
                env.max_obstacle_size, env.size
            ));
        }
        if !(1..=10).contains(&env.complexity) {
            return invalid(format!("complexity {} outside 1..=10", env.complexity));
        }

        let agents = &self.agents;
        if !agents.speed.is_finite() || agents.speed <= 0.0 {
            return invalid("agent speed must be positive".to_string());
        }
        // Written negated so NaN is rejected too
        if !(agents.safety_distance > 0.0 && agents.safety_distance.is_finite())
            || !(agents.critical_distance > 0.0 && agents.critical_distance.is_finite())
        {
            return invalid("safety and critical distances must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&agents.turn_sensitivity) {
            return invalid("turn sensitivity must lie in [0, 1]".to_string());
        }
        if !(agents.speed_limit_factor >= 1.0 && agents.speed_limit_factor.is_finite()) {
            return invalid("speed limit factor must be >= 1".to_string());
        }
        if agents.stuck.window < 2 || agents.stuck.history_capacity < agents.stuck.window {
            return invalid(
                "stuck window must be >= 2 and fit inside the history capacity".to_string(),
            );
        }
        if !(0.0..=1.0).contains(&agents.motion.damping)
            || !(agents.motion.response > 0.0 && agents.motion.response.is_finite())
        {
            return invalid("motion damping must lie in [0, 1] and response be positive".to_string());
        }

        if self.sensor.count == 0 {
            return invalid("at least one sensor is required".to_string());
        }
        if !self.sensor.range.is_finite() || self.sensor.range <= 0.0 {
            return invalid("sensor range must be positive".to_string());
        }

        let mapping = &self.mapping;
        if !(mapping.decay_factor > 0.0 && mapping.decay_factor <= 1.0) {
            return invalid(format!(
                "decay factor {} outside (0, 1]",
                mapping.decay_factor
            ));
        }
        if !(0.0..=1.0).contains(&mapping.confidence_threshold) {
            return invalid("confidence threshold must lie in [0, 1]".to_string());
        }
        if mapping.exploration_cell_size == 0 || mapping.exploration_cell_size > env.size {
            return invalid("exploration cell size must be in 1..=grid size".to_string());
        }

        if !(self.run.speed_multiplier > 0.0 && self.run.speed_multiplier.is_finite()) {
            return invalid("speed multiplier must be positive".to_string());
        }

        Ok(())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn invalid<T>(reason: String) -> SwarmResult<T> {
    Err(SwarmError::InvalidConfig(reason))
}
