//! Mobile agent state
//!
//! An agent is a disc-shaped robot driven by a damped velocity integrator.
//! It owns its stuck-detection history and a status used by the navigation
//! controller to pick a behavior.
//!
//! # Status machine
//!
//! ```text
//! Normal --stuck--> Stuck --stuck for > emergency_after ticks--> EmergencyEscape
//!   ^                 |                                              |
//!   +----not stuck----+--------------------not stuck-----------------+
//! ```

pub mod buffer;

pub use buffer::BoundedHistory;

use crate::algorithms::navigation::normalize_angle;
use crate::algorithms::occupancy_grid::Grid;
use crate::config::{AgentConfig, StuckDetectionConfig};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Navigation mode of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentStatus {
    #[default]
    Normal,
    Stuck,
    EmergencyEscape,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Normal => "normal",
            AgentStatus::Stuck => "stuck",
            AgentStatus::EmergencyEscape => "emergency_escape",
        }
    }
}

/// Status change reported by [`Agent::update_status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: AgentStatus,
    pub to: AgentStatus,
}

/// Result of a motion command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Proposed position collided; only the heading changed
    Blocked,
}

/// What other agents expose to collision checks and repulsion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: usize,
    pub position: Point2<f64>,
    pub safety_distance: f64,
}

impl From<&Agent> for Neighbor {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            position: agent.position,
            safety_distance: agent.safety_distance,
        }
    }
}

/// Rendering view of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: usize,
    pub position: Point2<f64>,
    pub heading: f64,
    pub status: AgentStatus,
    pub speed: f64,
    pub path: Vec<Point2<f64>>,
}

/// One simulated robot
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: usize,
    pub position: Point2<f64>,
    /// Radians in `[0, 2π)`
    pub heading: f64,
    pub velocity: Vector2<f64>,
    pub safety_distance: f64,
    pub critical_distance: f64,
    pub status: AgentStatus,
    pub position_history: BoundedHistory<Point2<f64>>,
    pub path_history: BoundedHistory<Point2<f64>>,
    /// Consecutive ticks without meaningful progress
    pub stuck_count: u32,
    pub time_in_status: u32,
    pub escape_attempts: u32,
    /// Turn chosen by the last stuck escape
    pub escape_direction: Option<f64>,
    pub distance_traveled: f64,
    /// Rejected moves
    pub collision_count: u32,
    pub visited_cells: HashSet<(usize, usize)>,
}

impl Agent {
    pub fn new(id: usize, position: Point2<f64>, heading: f64, config: &AgentConfig) -> Self {
        let mut path_history = BoundedHistory::new(config.max_path_length);
        path_history.push(position);

        Self {
            id,
            position,
            heading: normalize_angle(heading),
            velocity: Vector2::zeros(),
            safety_distance: config.safety_distance,
            critical_distance: config.critical_distance,
            status: AgentStatus::Normal,
            position_history: BoundedHistory::new(config.stuck.history_capacity),
            path_history,
            stuck_count: 0,
            time_in_status: 0,
            escape_attempts: 0,
            escape_direction: None,
            distance_traveled: 0.0,
            collision_count: 0,
            visited_cells: HashSet::new(),
        }
    }

    /// Stuck detection (any condition trips it)
    ///
    /// - more than `stuck_threshold` consecutive ticks without progress
    /// - over the last `window` positions, both axis variances below
    ///   `variance_threshold`, or the travelled path shorter than
    ///   `movement_threshold * window`
    pub fn is_stuck(&self, config: &StuckDetectionConfig) -> bool {
        if self.stuck_count > config.stuck_threshold {
            return true;
        }

        let window = config.window;
        if self.position_history.len() < window {
            return false;
        }

        let low_variance = self
            .position_history
            .recent_variance(window)
            .map(|(vx, vy)| vx < config.variance_threshold && vy < config.variance_threshold)
            .unwrap_or(false);
        let short_path = self.position_history.recent_path_length(window)
            < config.movement_threshold * window as f64;

        low_variance || short_path
    }

    /// Advance the status machine by one tick
    pub fn update_status(&mut self, config: &StuckDetectionConfig) -> Option<StatusTransition> {
        let from = self.status;
        let stuck = self.is_stuck(config);

        self.status = match (from, stuck) {
            (AgentStatus::Normal, true) => {
                self.time_in_status = 0;
                self.escape_attempts += 1;
                AgentStatus::Stuck
            }
            (AgentStatus::Stuck, true) if self.time_in_status + 1 > config.emergency_after => {
                self.time_in_status = 0;
                AgentStatus::EmergencyEscape
            }
            (status, true) => {
                self.time_in_status += 1;
                status
            }
            (AgentStatus::Normal, false) => {
                self.time_in_status += 1;
                AgentStatus::Normal
            }
            (_, false) => {
                self.time_in_status = 0;
                AgentStatus::Normal
            }
        };

        (from != self.status).then_some(StatusTransition {
            from,
            to: self.status,
        })
    }

    /// Potential-field forces from nearby agents and the grid edges
    fn field_forces(
        &self,
        grid_size: f64,
        others: &[Neighbor],
        config: &AgentConfig,
    ) -> Vector2<f64> {
        let motion = &config.motion;
        let mut force = Vector2::zeros();

        let repulsion_range = self.safety_distance * 4.0;
        for other in others.iter().filter(|o| o.id != self.id) {
            let diff = self.position - other.position;
            let dist = diff.norm();
            if dist < repulsion_range && dist > f64::EPSILON {
                force += diff / dist * (motion.agent_repulsion_gain / (dist * dist));
            }
        }

        let edge_range = self.safety_distance * 3.0;
        for axis in 0..2 {
            let coord = self.position[axis];
            if coord < edge_range {
                force[axis] += motion.boundary_gain / (coord + 1.0).powi(2);
            } else if coord > grid_size - edge_range {
                force[axis] -= motion.boundary_gain / (grid_size - coord + 1.0).powi(2);
            }
        }

        force
    }

    /// Would the agent collide if it stood at `candidate`?
    pub fn collides_at(&self, candidate: &Point2<f64>, grid: &Grid, others: &[Neighbor]) -> bool {
        let n = grid.size() as f64;
        let margin = self.safety_distance + 2.0;
        if candidate.x < margin
            || candidate.x > n - margin
            || candidate.y < margin
            || candidate.y > n - margin
        {
            return true;
        }

        let r = self.safety_distance;
        let (x0, x1) = ((candidate.x - r).floor() as i64, (candidate.x + r).floor() as i64);
        let (y0, y1) = ((candidate.y - r).floor() as i64, (candidate.y + r).floor() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                if grid.is_occupied(x, y) {
                    return true;
                }
            }
        }

        others
            .iter()
            .filter(|o| o.id != self.id)
            .any(|o| (candidate - o.position).norm() < self.safety_distance + o.safety_distance)
    }

    /// Apply a motion command through the damped integrator
    ///
    /// The heading always turns. The position only changes when the
    /// proposed position is collision free; otherwise the velocity is
    /// zeroed and the attempt counts towards stuck detection.
    pub fn drive(
        &mut self,
        speed: f64,
        turn: f64,
        grid: &Grid,
        others: &[Neighbor],
        config: &AgentConfig,
    ) -> MoveOutcome {
        let motion = &config.motion;

        let turn = turn.clamp(-motion.max_turn, motion.max_turn);
        self.heading = normalize_angle(self.heading + turn);

        let target = Vector2::new(self.heading.cos(), self.heading.sin()) * speed;
        let forces = self.field_forces(grid.size() as f64, others, config);
        self.velocity = (self.velocity + (target - self.velocity) * motion.response + forces)
            * motion.damping;

        let candidate = self.position + self.velocity;
        if self.collides_at(&candidate, grid, others) {
            self.velocity = Vector2::zeros();
            self.collision_count += 1;
            self.stuck_count += 1;
            self.position_history.push(self.position);
            return MoveOutcome::Blocked;
        }

        let displacement = (candidate - self.position).norm();
        self.position = candidate;
        self.distance_traveled += displacement;
        self.path_history.push(candidate);
        self.position_history.push(candidate);

        if displacement < config.stuck.movement_threshold {
            self.stuck_count += 1;
        } else {
            self.stuck_count = 0;
        }

        MoveOutcome::Moved
    }

    /// Coarse exploration cell containing the agent
    pub fn coarse_cell(&self, cell_size: usize) -> (usize, usize) {
        let size = cell_size.max(1) as f64;
        (
            (self.position.x.max(0.0) / size) as usize,
            (self.position.y.max(0.0) / size) as usize,
        )
    }

    /// Record the current coarse cell as explored
    pub fn mark_visited(&mut self, cell_size: usize) {
        let cell = self.coarse_cell(cell_size);
        self.visited_cells.insert(cell);
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position,
            heading: self.heading,
            status: self.status,
            speed: self.speed(),
            path: self.path_history.iter().copied().collect(),
        }
    }
}
