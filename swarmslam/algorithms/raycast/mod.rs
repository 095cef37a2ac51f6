//! Ray-cast range sensing
//!
//! A fan of noise-free range sensors spread over the half circle in front of an
//! agent. Rays march through the grid in fixed steps and stop at the first
//! occupied cell or when they leave the grid.
//!
//! # Example
//!
//! ```rust
//! use nalgebra::Point2;
//! use swarmslam::algorithms::occupancy_grid::Grid;
//! use swarmslam::algorithms::raycast::sense;
//!
//! let mut grid = Grid::new(50);
//! grid.apply_boundary(3);
//!
//! let readings = sense(&grid, &Point2::new(25.0, 25.0), 0.0, 30.0, 9);
//! assert_eq!(readings.len(), 9);
//!
//! // The middle ray looks straight ahead at the east wall
//! let ahead = &readings[4];
//! assert!(ahead.hit.is_some());
//! assert!(ahead.distance > 21.0 && ahead.distance < 23.0);
//! ```

use super::navigation::normalize_angle;
use super::occupancy_grid::{Grid, GridCoord};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Ray marching step (cells)
pub const RAY_STEP: f64 = 0.3;

/// One range measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Distance to the hit, or the sensor range when nothing was hit
    pub distance: f64,
    /// Absolute ray angle in `[0, 2π)`
    pub angle: f64,
    /// Cell that stopped the ray (may lie outside the grid)
    pub hit: Option<GridCoord>,
}

impl SensorReading {
    pub fn is_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// World point at the end of the ray
    pub fn end_point(&self, origin: &Point2<f64>) -> Point2<f64> {
        origin + direction(self.angle) * self.distance
    }
}

/// Unit vector for an angle
pub fn direction(angle: f64) -> Vector2<f64> {
    Vector2::new(angle.cos(), angle.sin())
}

/// Evenly spaced sensor angles over `[heading - π/2, heading + π/2]`
///
/// A single sensor looks straight along the heading.
pub fn sensor_angles(heading: f64, num_sensors: usize) -> Vec<f64> {
    match num_sensors {
        0 => Vec::new(),
        1 => vec![heading],
        n => {
            let step = std::f64::consts::PI / (n - 1) as f64;
            (0..n)
                .map(|i| heading - FRAC_PI_2 + step * i as f64)
                .collect()
        }
    }
}

/// March a single ray until it hits something or reaches `max_range`
pub fn cast_ray(grid: &Grid, origin: &Point2<f64>, angle: f64, max_range: f64) -> SensorReading {
    let dir = direction(angle);
    let angle = normalize_angle(angle);

    let mut r = 0.0;
    while r < max_range {
        let point = origin + dir * r;
        let cell = GridCoord::from_point(&point);

        // Leaving the grid counts as a hit, same as a wall
        if !grid.contains(cell.x, cell.y) || grid.is_occupied(cell.x, cell.y) {
            return SensorReading {
                distance: r,
                angle,
                hit: Some(cell),
            };
        }
        r += RAY_STEP;
    }

    SensorReading {
        distance: max_range,
        angle,
        hit: None,
    }
}

/// Read the whole sensor fan
pub fn sense(
    grid: &Grid,
    position: &Point2<f64>,
    heading: f64,
    sensor_range: f64,
    num_sensors: usize,
) -> Vec<SensorReading> {
    sensor_angles(heading, num_sensors)
        .into_iter()
        .map(|angle| cast_ray(grid, position, angle, sensor_range))
        .collect()
}

/// Free run along `angle` sampled in whole-cell steps
///
/// Returns the largest `r` in `[1, max_range)` such that every sample up to
/// `r` lands in a free cell, or 0 when the first sample is blocked.
pub fn free_distance(grid: &Grid, position: &Point2<f64>, angle: f64, max_range: f64) -> f64 {
    let dir = direction(angle);
    let mut free = 0.0;

    let mut r = 1.0;
    while r < max_range {
        let cell = GridCoord::from_point(&(position + dir * r));
        if grid.is_occupied(cell.x, cell.y) {
            break;
        }
        free = r;
        r += 1.0;
    }

    free
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{PI, TAU};

    fn walled(size: usize) -> Grid {
        let mut grid = Grid::new(size);
        grid.apply_boundary(3);
        grid
    }

    #[test]
    fn test_sensor_angles_span_half_circle() {
        let angles = sensor_angles(1.0, 5);
        assert_eq!(angles.len(), 5);
        assert_relative_eq!(angles[0], 1.0 - PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(angles[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(angles[4], 1.0 + PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_sensor_looks_ahead() {
        assert_eq!(sensor_angles(0.7, 1), vec![0.7]);
        assert!(sensor_angles(0.7, 0).is_empty());
    }

    #[test]
    fn test_ray_hits_wall() {
        let grid = walled(50);
        let reading = cast_ray(&grid, &Point2::new(25.5, 25.5), 0.0, 40.0);

        // First occupied column is x = 47
        let hit = reading.hit.expect("wall within range");
        assert_eq!(hit, GridCoord::new(47, 25));
        assert!(reading.distance >= 21.5 && reading.distance < 21.5 + RAY_STEP);
    }

    #[test]
    fn test_ray_reaches_max_range() {
        let grid = walled(100);
        let reading = cast_ray(&grid, &Point2::new(50.0, 50.0), PI, 10.0);

        assert!(!reading.is_hit());
        assert_eq!(reading.distance, 10.0);
        assert_relative_eq!(reading.angle, PI, epsilon = 1e-12);
    }

    #[test]
    fn test_ray_stops_on_obstacle() {
        let mut grid = walled(50);
        grid.set_occupied(30, 20);

        let reading = cast_ray(&grid, &Point2::new(20.5, 20.5), 0.0, 30.0);
        assert_eq!(reading.hit, Some(GridCoord::new(30, 20)));
        assert!(reading.distance < 10.0);
    }

    #[test]
    fn test_ray_leaving_grid_is_a_hit() {
        // No walls: the grid edge itself stops the ray
        let grid = Grid::new(20);
        let reading = cast_ray(&grid, &Point2::new(10.0, 10.0), PI / 2.0, 50.0);

        let hit = reading.hit.expect("edge hit");
        assert!(!grid.contains(hit.x, hit.y));
        assert!(reading.distance >= 10.0 && reading.distance < 10.0 + RAY_STEP);
    }

    #[test]
    fn test_negative_angle_is_normalized() {
        let grid = walled(50);
        let reading = cast_ray(&grid, &Point2::new(25.0, 25.0), -PI / 2.0, 5.0);
        assert!(reading.angle >= 0.0 && reading.angle < TAU);
        assert_relative_eq!(reading.angle, 1.5 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_sense_fan() {
        let grid = walled(60);
        let readings = sense(&grid, &Point2::new(30.0, 30.0), 0.0, 30.0, 9);

        assert_eq!(readings.len(), 9);
        for reading in &readings {
            assert!(reading.distance >= 0.0 && reading.distance <= 30.0);
        }
        // Side rays face the north and south walls at equal range
        assert_relative_eq!(readings[0].distance, readings[8].distance, epsilon = 1.0);
    }

    #[test]
    fn test_end_point() {
        let reading = SensorReading {
            distance: 2.0,
            angle: PI / 2.0,
            hit: None,
        };
        let end = reading.end_point(&Point2::new(1.0, 1.0));
        assert_relative_eq!(end.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(end.y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_free_distance() {
        let mut grid = walled(50);
        grid.set_occupied(30, 25);

        let pos = Point2::new(25.5, 25.5);
        // Probes at x = 26..29 are free, x = 30 is blocked
        assert_eq!(free_distance(&grid, &pos, 0.0, 20.0), 4.0);
        // Open direction runs into the west wall at x = 2
        assert_eq!(free_distance(&grid, &pos, PI, 30.0), 22.0);
        // Capped by max range
        assert_eq!(free_distance(&grid, &pos, PI, 5.0), 4.0);
    }

    #[test]
    fn test_free_distance_blocked_immediately() {
        let grid = Grid::filled(10, crate::algorithms::occupancy_grid::Cell::Occupied);
        assert_eq!(free_distance(&grid, &Point2::new(5.0, 5.0), 0.0, 10.0), 0.0);
    }
}
