//! Bounded history buffer
//!
//! Fixed-capacity FIFO used for an agent's recent positions. Pushing into a
//! full buffer evicts the oldest entry.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A fixed-capacity ring of the most recent items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Create an empty history holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, evicting the oldest one when full
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Item at logical index (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// The last `count` items, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> {
        self.items.iter().skip(self.items.len().saturating_sub(count))
    }
}

// Trajectory statistics used by stuck detection
impl BoundedHistory<Point2<f64>> {
    /// Mean of the last `count` positions
    pub fn recent_mean(&self, count: usize) -> Option<Point2<f64>> {
        let n = count.min(self.len());
        if n == 0 {
            return None;
        }
        let sum = self
            .recent(n)
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        Some(Point2::from(sum / n as f64))
    }

    /// Population variance of x and y over the last `count` positions
    pub fn recent_variance(&self, count: usize) -> Option<(f64, f64)> {
        let n = count.min(self.len());
        let mean = self.recent_mean(n)?;
        let (vx, vy) = self.recent(n).fold((0.0, 0.0), |(vx, vy), p| {
            let d = p - mean;
            (vx + d.x * d.x, vy + d.y * d.y)
        });
        Some((vx / n as f64, vy / n as f64))
    }

    /// Summed step length over the last `count` positions
    pub fn recent_path_length(&self, count: usize) -> f64 {
        let mut total = 0.0;
        let mut previous: Option<&Point2<f64>> = None;
        for point in self.recent(count) {
            if let Some(prev) = previous {
                total += (point - prev).norm();
            }
            previous = Some(point);
        }
        total
    }
}
