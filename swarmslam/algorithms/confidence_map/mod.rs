//! Confidence-decay occupancy map
//!
//! Lightweight mapping from range readings. Each cell holds a confidence in
//! `[0, 1]` that it contains an obstacle. Evidence is forgotten multiplicatively
//! every tick, close hits add a bounded amount of confidence, and the space a
//! ray travelled through is decayed a little extra.
//!
//! This is not Bayesian occupancy mapping: there are no log-odds, no loop
//! closure and no fusion of separate maps.
//!
//! # Example
//!
//! ```rust
//! use nalgebra::Point2;
//! use swarmslam::algorithms::confidence_map::{update_map, ConfidenceMap};
//! use swarmslam::algorithms::occupancy_grid::GridCoord;
//! use swarmslam::algorithms::raycast::SensorReading;
//!
//! let mut map = ConfidenceMap::new(50);
//! let reading = SensorReading { distance: 3.0, angle: 0.0, hit: Some(GridCoord::new(28, 25)) };
//!
//! update_map(&mut map, &Point2::new(25.0, 25.5), &[reading], 30.0, 0.7, 0.95);
//! assert!(map.get(28, 25) > 0.0);
//! ```

use super::occupancy_grid::GridCoord;
use super::raycast::SensorReading;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Extra decay applied to cells a ray passed through
pub const FREE_SPACE_DECAY: f64 = 0.95;

/// Confidence added per hit, scaled by the hit confidence
pub const HIT_GAIN: f64 = 0.1;

/// Points sampled along each ray for free-space decay
pub const FREE_SPACE_SAMPLES: usize = 20;

/// Square grid of obstacle confidences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMap {
    size: usize,
    values: Vec<f64>, // row-major, 0.0 = no evidence
}

impl ConfidenceMap {
    /// Create a zero-filled map
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major values (`y * size + x`)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size {
            Some(y as usize * self.size + x as usize)
        } else {
            None
        }
    }

    /// Confidence of a cell; 0 outside the map
    pub fn get(&self, x: i64, y: i64) -> f64 {
        self.index(x, y).map(|i| self.values[i]).unwrap_or(0.0)
    }

    /// Forget evidence: multiply every cell by `factor`
    pub fn decay(&mut self, factor: f64) {
        let factor = factor.clamp(0.0, 1.0);
        for value in &mut self.values {
            *value *= factor;
        }
    }

    /// Fold one agent's readings into the map (no global decay)
    ///
    /// Readings at max range or hitting outside the map are ignored. A hit
    /// counts only when `1 - distance / sensor_range` exceeds
    /// `confidence_threshold`.
    pub fn integrate(
        &mut self,
        position: &Point2<f64>,
        readings: &[SensorReading],
        sensor_range: f64,
        confidence_threshold: f64,
    ) {
        let range = sensor_range.max(f64::EPSILON);

        for reading in readings {
            if reading.distance >= sensor_range {
                continue;
            }
            let Some(hit) = reading.hit else {
                continue;
            };
            let Some(hit_index) = self.index(hit.x, hit.y) else {
                continue;
            };

            let confidence = 1.0 - reading.distance / range;
            if confidence <= confidence_threshold {
                continue;
            }

            let cell = &mut self.values[hit_index];
            *cell = (*cell + HIT_GAIN * confidence).min(1.0);

            self.decay_free_space(position, &reading.end_point(position), hit);
        }
    }

    /// Sample the segment `from -> to` and decay every cell except the hit
    fn decay_free_space(&mut self, from: &Point2<f64>, to: &Point2<f64>, hit: GridCoord) {
        let delta = to - from;
        let last = (FREE_SPACE_SAMPLES - 1) as f64;

        for i in 0..FREE_SPACE_SAMPLES {
            let point = from + delta * (i as f64 / last);
            let cell = GridCoord::from_point(&point);
            if cell == hit {
                continue;
            }
            if let Some(index) = self.index(cell.x, cell.y) {
                self.values[index] *= FREE_SPACE_DECAY;
            }
        }
    }

    /// Fraction of cells whose confidence exceeds `threshold`
    pub fn coverage(&self, threshold: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mapped = self.values.iter().filter(|v| **v > threshold).count();
        mapped as f64 / self.values.len() as f64
    }

    /// Highest confidence on the map
    pub fn max_confidence(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Reset every cell to zero
    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }
}

/// Full single-agent update: global decay, then integrate `readings`
pub fn update_map(
    map: &mut ConfidenceMap,
    position: &Point2<f64>,
    readings: &[SensorReading],
    sensor_range: f64,
    confidence_threshold: f64,
    decay_factor: f64,
) {
    map.decay(decay_factor);
    map.integrate(position, readings, sensor_range, confidence_threshold);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hit_at(distance: f64, x: i64, y: i64) -> SensorReading {
        SensorReading {
            distance,
            angle: 0.0,
            hit: Some(GridCoord::new(x, y)),
        }
    }

    #[test]
    fn test_new_map_is_empty() {
        let map = ConfidenceMap::new(20);
        assert_eq!(map.size(), 20);
        assert_eq!(map.values().len(), 400);
        assert_eq!(map.max_confidence(), 0.0);
        assert_eq!(map.get(-1, 5), 0.0);
    }

    #[test]
    fn test_close_hit_adds_confidence() {
        let mut map = ConfidenceMap::new(50);
        let origin = Point2::new(20.5, 20.5);

        // confidence = 1 - 3/30 = 0.9
        map.integrate(&origin, &[hit_at(3.0, 23, 20)], 30.0, 0.7);
        assert_relative_eq!(map.get(23, 20), 0.09, epsilon = 1e-12);
    }

    #[test]
    fn test_far_hit_ignored() {
        let mut map = ConfidenceMap::new(50);
        let origin = Point2::new(10.5, 10.5);

        // confidence = 1 - 20/30 < 0.7
        map.integrate(&origin, &[hit_at(20.0, 30, 10)], 30.0, 0.7);
        assert_eq!(map.max_confidence(), 0.0);
    }

    #[test]
    fn test_max_range_reading_ignored() {
        let mut map = ConfidenceMap::new(50);
        let reading = SensorReading {
            distance: 30.0,
            angle: 0.0,
            hit: None,
        };
        map.integrate(&Point2::new(5.0, 5.0), &[reading], 30.0, 0.0);
        assert_eq!(map.max_confidence(), 0.0);
    }

    #[test]
    fn test_out_of_map_hit_ignored() {
        let mut map = ConfidenceMap::new(10);
        map.integrate(&Point2::new(9.5, 5.5), &[hit_at(0.6, 10, 5)], 30.0, 0.7);
        assert_eq!(map.max_confidence(), 0.0);
    }

    #[test]
    fn test_accumulation_saturates() {
        let mut map = ConfidenceMap::new(20);
        let origin = Point2::new(10.5, 10.5);

        for _ in 0..200 {
            map.integrate(&origin, &[hit_at(0.6, 11, 10)], 30.0, 0.5);
        }
        assert_eq!(map.get(11, 10), 1.0);
    }

    #[test]
    fn test_free_space_decays_along_ray() {
        let mut map = ConfidenceMap::new(50);
        let origin = Point2::new(20.5, 20.5);

        // Seed evidence on the path and on the hit cell
        for _ in 0..10 {
            map.integrate(&origin, &[hit_at(2.0, 22, 20)], 30.0, 0.5);
        }
        let before_hit = map.get(22, 20);
        assert!(before_hit > 0.0);

        // Longer ray through (22, 20) now decays it as free space
        map.integrate(&origin, &[hit_at(5.0, 25, 20)], 30.0, 0.5);
        assert!(map.get(22, 20) < before_hit);
        assert!(map.get(25, 20) > 0.0);
    }

    #[test]
    fn test_decay() {
        let mut map = ConfidenceMap::new(20);
        map.integrate(&Point2::new(10.5, 10.5), &[hit_at(0.6, 11, 10)], 30.0, 0.5);
        let before = map.get(11, 10);

        map.decay(0.5);
        assert_relative_eq!(map.get(11, 10), before * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_update_map_decays_before_adding() {
        let mut map = ConfidenceMap::new(50);
        let origin = Point2::new(20.5, 20.5);

        update_map(&mut map, &origin, &[hit_at(3.0, 23, 20)], 30.0, 0.7, 0.5);
        assert_relative_eq!(map.get(23, 20), 0.09, epsilon = 1e-12);

        update_map(&mut map, &origin, &[hit_at(3.0, 23, 20)], 30.0, 0.7, 0.5);
        assert_relative_eq!(map.get(23, 20), 0.09 * 0.5 + 0.09, epsilon = 1e-12);
    }

    #[test]
    fn test_coverage() {
        let mut map = ConfidenceMap::new(10);
        assert_eq!(map.coverage(0.0), 0.0);

        map.integrate(&Point2::new(5.5, 5.5), &[hit_at(0.6, 6, 5)], 30.0, 0.5);
        assert_relative_eq!(map.coverage(0.01), 0.01, epsilon = 1e-12);

        map.clear();
        assert_eq!(map.coverage(0.0), 0.0);
    }

    #[test]
    fn test_zero_range_does_not_panic() {
        let mut map = ConfidenceMap::new(10);
        map.integrate(&Point2::new(5.0, 5.0), &[hit_at(0.0, 5, 5)], 0.0, 0.5);
        assert!(map.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
