//! Per-tick aggregate statistics
//!
//! Everything here is re-derived from agent state on each tick rather than
//! accumulated incrementally.

use crate::agent::{Agent, AgentStatus};
use crate::algorithms::confidence_map::ConfidenceMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Map cells above this confidence count as mapped
pub const MAP_COVERAGE_THRESHOLD: f64 = 0.05;

/// Aggregates for one completed tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    pub tick: u64,
    /// Distinct coarse cells visited by any agent over all coarse cells, capped at 1
    pub exploration_rate: f64,
    /// Rejected moves during this tick
    pub collisions: u32,
    pub total_collisions: u64,
    /// Agents not in `Normal` status
    pub stuck_agents: usize,
    /// Mean distance travelled per agent since spawn
    pub average_distance: f64,
    pub average_speed: f64,
    /// Fraction of map cells above [`MAP_COVERAGE_THRESHOLD`]
    pub map_coverage: f64,
}

impl StepStats {
    pub fn compute(
        tick: u64,
        agents: &[Agent],
        map: &ConfidenceMap,
        collisions: u32,
        total_collisions: u64,
        cell_size: usize,
    ) -> Self {
        let count = agents.len().max(1) as f64;

        Self {
            tick,
            exploration_rate: exploration_rate(agents, map.size(), cell_size),
            collisions,
            total_collisions,
            stuck_agents: agents
                .iter()
                .filter(|a| a.status != AgentStatus::Normal)
                .count(),
            average_distance: agents.iter().map(|a| a.distance_traveled).sum::<f64>() / count,
            average_speed: agents.iter().map(Agent::speed).sum::<f64>() / count,
            map_coverage: map.coverage(MAP_COVERAGE_THRESHOLD),
        }
    }
}

/// Union of visited coarse cells over the number of coarse cells in the grid
pub fn exploration_rate(agents: &[Agent], grid_size: usize, cell_size: usize) -> f64 {
    let cell_size = cell_size.max(1);
    let per_side = grid_size.div_ceil(cell_size);
    let total = per_side * per_side;
    if total == 0 {
        return 0.0;
    }

    let visited: HashSet<&(usize, usize)> =
        agents.iter().flat_map(|a| a.visited_cells.iter()).collect();

    (visited.len() as f64 / total as f64).min(1.0)
}
