//! Reactive potential-field navigation
//!
//! Turns a fan of range readings into a `(linear_speed, turn_angle)` command.
//! Behavior depends on the agent's status:
//!
//! - **Normal**: cruise with small heading jitter, slow down and veer toward the
//!   clearer side when the front sector closes in, reverse when very close
//! - **Stuck**: back off along a randomized escape heading that prefers the
//!   clearer side and points away from where the agent has just been
//! - **EmergencyEscape**: sample 16 directions around the agent and drive at
//!   double speed toward the longest free run
//!
//! Other agents ahead within the detection range slow the agent down and turn
//! it away in every status. In Normal the obstacle rules refine that command;
//! in Stuck and EmergencyEscape it is applied on top of the escape.
//!
//! Sector naming follows the sensor fan order: `left` is the first third
//! (negative relative angles), `right` the last third. A positive turn rotates
//! toward the right sector.

use super::occupancy_grid::Grid;
use super::raycast::{free_distance, SensorReading};
use crate::agent::{Agent, AgentStatus, Neighbor};
use crate::config::AgentConfig;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI, TAU};

/// Directions sampled by emergency escape
pub const ESCAPE_DIRECTIONS: usize = 16;

/// Heading jitter while cruising (radians, before sensitivity)
const CRUISE_JITTER: f64 = 0.1;

/// Asymmetry below which both sides count as equally clear
const ASYMMETRY_DEADBAND: f64 = 0.2;

/// One side must be this much clearer to bias a stuck escape
const CLEARANCE_BIAS_RATIO: f64 = 1.2;

/// Mean distances per sector of the sensor fan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorDistances {
    pub left: f64,
    pub front: f64,
    pub right: f64,
    /// Shortest single reading
    pub nearest: f64,
}

impl SectorDistances {
    /// Split readings into thirds; an empty fan reads as unbounded clearance
    pub fn from_readings(readings: &[SensorReading]) -> Self {
        let n = readings.len();
        if n == 0 {
            return Self {
                left: f64::INFINITY,
                front: f64::INFINITY,
                right: f64::INFINITY,
                nearest: f64::INFINITY,
            };
        }

        let third = (n / 3).max(1);
        let middle = if third < n - third {
            &readings[third..n - third]
        } else {
            &readings[n / 2..n / 2 + 1]
        };

        Self {
            left: mean_distance(&readings[..third]),
            front: mean_distance(middle),
            right: mean_distance(&readings[n - third..]),
            nearest: readings
                .iter()
                .map(|r| r.distance)
                .fold(f64::INFINITY, f64::min),
        }
    }
}

fn mean_distance(readings: &[SensorReading]) -> f64 {
    readings.iter().map(|r| r.distance).sum::<f64>() / readings.len().max(1) as f64
}

/// Which rule produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Cruise,
    Avoid,
    Reverse,
    Escape,
    Emergency,
}

/// Motion command for the next tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub linear_speed: f64,
    pub turn_angle: f64,
    /// Another agent slowed or reversed this agent
    pub repulsed: bool,
    pub behavior: Behavior,
}

/// Map an angle into `[0, 2π)`
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly 2π
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Wrap an angle into `[-π, π)`
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Combined effect of nearby agents on a command
#[derive(Debug, Clone, Copy, PartialEq)]
struct Repulsion {
    speed_scale: f64,
    /// Turn away from the last neighbor ahead
    turn: Option<f64>,
    /// A neighbor ahead is inside the critical distance
    reverse: bool,
    active: bool,
}

impl Repulsion {
    fn from_neighbors(
        agent: &Agent,
        others: &[Neighbor],
        detection: f64,
        critical: f64,
        sensitivity: f64,
    ) -> Self {
        let mut repulsion = Self {
            speed_scale: 1.0,
            turn: None,
            reverse: false,
            active: false,
        };

        for other in others.iter().filter(|o| o.id != agent.id) {
            let offset = other.position - agent.position;
            let dist = offset.norm();
            if dist >= detection {
                continue;
            }

            let bearing = wrap_angle(offset.y.atan2(offset.x) - agent.heading);
            if bearing.abs() < FRAC_PI_2 {
                repulsion.speed_scale *= 0.2;
                repulsion.turn = Some(-sign(bearing) * PI * 0.8 * sensitivity);
                repulsion.reverse |= dist < critical;
                repulsion.active = true;
            } else if dist < critical {
                repulsion.speed_scale *= 0.5;
                repulsion.active = true;
            }
        }

        repulsion
    }

    /// Shape `(speed, turn)`; a close neighbor ahead forces a reverse at `base_speed`
    fn apply(&self, speed: f64, turn: f64, base_speed: f64) -> (f64, f64) {
        if !self.active {
            return (speed, turn);
        }
        let speed = if self.reverse {
            -base_speed
        } else {
            speed * self.speed_scale
        };
        (speed, self.turn.unwrap_or(turn))
    }
}

/// Choose the next motion command for `agent`
///
/// Stuck escapes remember their turn in `agent.escape_direction`, which is
/// the only state this function writes.
pub fn decide<R: Rng + ?Sized>(
    agent: &mut Agent,
    readings: &[SensorReading],
    others: &[Neighbor],
    grid: &Grid,
    sensor_range: f64,
    config: &AgentConfig,
    rng: &mut R,
) -> Decision {
    let sectors = SectorDistances::from_readings(readings);
    let sensitivity = config.turn_sensitivity;
    let critical = agent.critical_distance.max(f64::EPSILON);
    let detection = config.detection_distance().max(f64::EPSILON);

    let repulsion = Repulsion::from_neighbors(agent, others, detection, critical, sensitivity);

    let (speed, turn, behavior) = match agent.status {
        AgentStatus::Normal => {
            // Neighbors shape the command first, obstacles refine it
            let (mut speed, mut turn) = repulsion.apply(config.speed, 0.0, config.speed);

            let behavior = if sectors.front >= detection {
                if !repulsion.active {
                    turn = cruise_turn(&sectors, critical, sensitivity, rng);
                }
                Behavior::Cruise
            } else {
                speed *= (sectors.front / detection).powi(2).max(0.1);

                let asymmetry =
                    (sectors.right - sectors.left) / (sectors.right + sectors.left).max(f64::EPSILON);
                if asymmetry.abs() >= ASYMMETRY_DEADBAND {
                    turn = sign(asymmetry) * PI * 0.7 * sensitivity * (0.5 + 0.5 * asymmetry.abs());
                } else {
                    let side = if sectors.right >= sectors.left { 1.0 } else { -1.0 };
                    turn = side * PI * sensitivity;
                    speed *= 0.5;
                }

                if sectors.front < agent.safety_distance * 1.5 {
                    speed = -config.speed * 0.7;
                    turn *= 1.5;
                    Behavior::Reverse
                } else {
                    Behavior::Avoid
                }
            };
            (speed, turn, behavior)
        }
        AgentStatus::Stuck => {
            let (escape_speed, escape_turn) =
                stuck_escape(agent, &sectors, critical, config, rng);
            let (speed, turn) = repulsion.apply(escape_speed, escape_turn, config.speed);
            agent.escape_direction = Some(turn);
            (speed, turn, Behavior::Escape)
        }
        AgentStatus::EmergencyEscape => {
            let escape_turn = emergency_turn(agent, grid, sensor_range);
            let (speed, turn) = repulsion.apply(config.speed * 2.0, escape_turn, config.speed);
            (speed, turn, Behavior::Emergency)
        }
    };

    let limit = config.speed_limit();
    Decision {
        linear_speed: speed.clamp(-limit, limit),
        turn_angle: turn.clamp(-PI, PI),
        repulsed: repulsion.active,
        behavior,
    }
}

/// Heading correction with a clear front sector
fn cruise_turn<R: Rng + ?Sized>(
    sectors: &SectorDistances,
    critical: f64,
    sensitivity: f64,
    rng: &mut R,
) -> f64 {
    // Hugging a wall: ease away from it
    let side = sectors.left.min(sectors.right);
    if side < critical {
        let away = if sectors.left < sectors.right { 1.0 } else { -1.0 };
        return away * PI * 0.3 * sensitivity * (1.0 - side / critical)
            + rng.gen_range(-CRUISE_JITTER..CRUISE_JITTER) * sensitivity;
    }

    if sectors.nearest < critical * 2.0 {
        rng.gen_range(-FRAC_PI_3..FRAC_PI_3) * sensitivity
    } else {
        rng.gen_range(-CRUISE_JITTER..CRUISE_JITTER) * sensitivity
    }
}

/// Reverse along a randomized heading away from recent positions
fn stuck_escape<R: Rng + ?Sized>(
    agent: &Agent,
    sectors: &SectorDistances,
    critical: f64,
    config: &AgentConfig,
    rng: &mut R,
) -> (f64, f64) {
    let sensitivity = config.turn_sensitivity;

    let mut turn = match agent.escape_direction {
        Some(previous) => previous + rng.gen_range(-FRAC_PI_2..FRAC_PI_2),
        None => rng.gen_range(-PI..PI),
    };

    let backoff = sectors.nearest.min(critical);
    let mut speed = -config.speed * (1.0 + backoff / critical);

    if sectors.left > sectors.right * CLEARANCE_BIAS_RATIO {
        turn = -FRAC_PI_2 * sensitivity;
    } else if sectors.right > sectors.left * CLEARANCE_BIAS_RATIO {
        turn = FRAC_PI_2 * sensitivity;
    }

    if agent.stuck_count > config.stuck.escalation_threshold {
        speed *= 1.5;
        turn *= 1.5;
    }

    // Reflect away from the centroid of the last few positions
    if agent.position_history.len() > 3 {
        if let Some(centroid) = agent.position_history.recent_mean(3) {
            let away = agent.position - centroid;
            if away.norm() > f64::EPSILON {
                turn = wrap_angle(away.y.atan2(away.x) - agent.heading);
            }
        }
    }

    (speed, turn)
}

/// Turn toward the direction with the longest free run
fn emergency_turn(agent: &Agent, grid: &Grid, sensor_range: f64) -> f64 {
    let mut best_angle = 0.0;
    let mut best_distance = f64::NEG_INFINITY;

    for i in 0..ESCAPE_DIRECTIONS {
        let angle = TAU * i as f64 / ESCAPE_DIRECTIONS as f64;
        let distance = free_distance(grid, &agent.position, angle, sensor_range);
        if distance > best_distance {
            best_distance = distance;
            best_angle = angle;
        }
    }

    wrap_angle(best_angle - agent.heading)
}
