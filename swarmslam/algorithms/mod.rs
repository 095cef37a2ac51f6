//! Pure computational algorithms for swarm mapping
//!
//! No I/O in here: every function takes the grid, readings and parameters it
//! needs and returns plain values.
//!
//! # Available Algorithms
//!
//! ## World
//! - **occupancy_grid**: Square occupancy grid and environment generators
//!
//! ## Perception
//! - **raycast**: Fixed-step ray marching range sensors
//!
//! ## Mapping
//! - **confidence_map**: Confidence-decay obstacle map
//!
//! ## Control
//! - **navigation**: Reactive potential-field controller with stuck escapes

pub mod confidence_map;
pub mod navigation;
pub mod occupancy_grid;
pub mod raycast;

pub use confidence_map::{update_map, ConfidenceMap};
pub use navigation::{decide, Behavior, Decision, SectorDistances};
pub use occupancy_grid::{
    create_environment, generate_environment, Cell, Difficulty, EnvironmentAssessment, Grid,
    GridCoord,
};
pub use raycast::{free_distance, sense, SensorReading};
