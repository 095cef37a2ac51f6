//! 2D Occupancy Grid and Environment Generation
//!
//! Static square world the agents drive in.
//!
//! # Features
//!
//! - Binary occupancy (free/occupied), row-major storage
//! - Out-of-bounds queries report `Occupied`
//! - Boundary walls that survive every generator
//! - Random rectangles plus maze, office, warehouse and outdoor layouts
//! - Pre-generation difficulty assessment
//!
//! # Example
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use swarmslam::algorithms::occupancy_grid::create_environment;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let grid = create_environment(100, 15, 8, &mut rng);
//!
//! // Border is always a wall
//! assert!(grid.is_occupied(0, 0));
//! // Outside the grid counts as occupied too
//! assert!(grid.is_occupied(-4, 250));
//! ```

use crate::config::{EnvironmentConfig, EnvironmentLayout, MIN_BOUNDARY_THICKNESS};
use nalgebra::Point2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Distance kept between random obstacles and the border
const OBSTACLE_MARGIN: usize = 5;

/// Smallest random obstacle edge
const MIN_OBSTACLE_SIZE: usize = 3;

/// Grid cell state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Free,
    Occupied,
}

/// Integer cell coordinate (may lie outside the grid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i64,
    pub y: i64,
}

impl GridCoord {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Cell containing a continuous world point
    pub fn from_point(point: &Point2<f64>) -> Self {
        Self {
            x: point.x.floor() as i64,
            y: point.y.floor() as i64,
        }
    }

    /// Center of the cell in world coordinates
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x as f64 + 0.5, self.y as f64 + 0.5)
    }
}

/// Square occupancy grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an all-free grid
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Free; size * size],
        }
    }

    /// Create a grid with every cell set to `cell`
    pub fn filled(size: usize, cell: Cell) -> Self {
        Self {
            size,
            cells: vec![cell; size * size],
        }
    }

    /// Edge length in cells
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major cell slice (`y * size + x`)
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Check if coordinates are inside the grid
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if self.contains(x, y) {
            Some(y as usize * self.size + x as usize)
        } else {
            None
        }
    }

    /// Cell state; out of bounds = occupied
    pub fn cell(&self, x: i64, y: i64) -> Cell {
        self.index(x, y)
            .map(|i| self.cells[i])
            .unwrap_or(Cell::Occupied)
    }

    pub fn is_occupied(&self, x: i64, y: i64) -> bool {
        self.cell(x, y) == Cell::Occupied
    }

    pub fn is_free(&self, x: i64, y: i64) -> bool {
        self.cell(x, y) == Cell::Free
    }

    /// Occupancy of the cell containing a world point
    pub fn is_point_occupied(&self, point: &Point2<f64>) -> bool {
        let coord = GridCoord::from_point(point);
        self.is_occupied(coord.x, coord.y)
    }

    /// Set a cell; ignored outside the grid
    pub fn set(&mut self, x: i64, y: i64, cell: Cell) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = cell;
        }
    }

    pub fn set_occupied(&mut self, x: i64, y: i64) {
        self.set(x, y, Cell::Occupied);
    }

    pub fn set_free(&mut self, x: i64, y: i64) {
        self.set(x, y, Cell::Free);
    }

    /// Fill the rectangle `[x, x + width) × [y, y + height)`, clipped to the grid
    pub fn fill_rect(&mut self, x: i64, y: i64, width: usize, height: usize, cell: Cell) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i64).min(self.size as i64);
        let y1 = (y + height as i64).min(self.size as i64);

        for cy in y0..y1 {
            for cx in x0..x1 {
                self.set(cx, cy, cell);
            }
        }
    }

    /// Mark the outermost `thickness` rows and columns occupied
    pub fn apply_boundary(&mut self, thickness: usize) {
        let n = self.size;
        let t = thickness.min(n);
        self.fill_rect(0, 0, n, t, Cell::Occupied);
        self.fill_rect(0, (n - t) as i64, n, t, Cell::Occupied);
        self.fill_rect(0, 0, t, n, Cell::Occupied);
        self.fill_rect((n - t) as i64, 0, t, n, Cell::Occupied);
    }

    /// Check that the outer `thickness` border is entirely occupied
    pub fn border_is_occupied(&self, thickness: usize) -> bool {
        let n = self.size;
        let far = n.saturating_sub(thickness);
        (0..n).all(|y| {
            (0..n).all(|x| {
                let on_border = x < thickness || y < thickness || x >= far || y >= far;
                !on_border || self.is_occupied(x as i64, y as i64)
            })
        })
    }

    /// Number of occupied cells
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Occupied).count()
    }

    /// Fraction of cells that are occupied
    pub fn occupied_ratio(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.occupied_count() as f64 / self.cells.len() as f64
    }
}

/// Build a bordered grid with random rectangular obstacles
///
/// # Arguments
/// * `size` - Grid edge in cells
/// * `obstacle_count` - Rectangles to place (overlaps allowed)
/// * `max_obstacle_size` - Largest rectangle edge
/// * `rng` - Randomness source; same seed gives the same grid
pub fn create_environment<R: Rng + ?Sized>(
    size: usize,
    obstacle_count: usize,
    max_obstacle_size: usize,
    rng: &mut R,
) -> Grid {
    let mut grid = Grid::new(size);
    grid.apply_boundary(MIN_BOUNDARY_THICKNESS);
    place_random_obstacles(&mut grid, obstacle_count, max_obstacle_size, rng);
    grid
}

/// Build the environment described by `config`
pub fn generate_environment<R: Rng + ?Sized>(config: &EnvironmentConfig, rng: &mut R) -> Grid {
    let thickness = config.boundary_thickness.max(MIN_BOUNDARY_THICKNESS);
    let mut grid = Grid::new(config.size);
    grid.apply_boundary(thickness);

    let complexity = config.complexity as usize;
    match config.layout {
        EnvironmentLayout::Random => {
            place_random_obstacles(&mut grid, config.obstacle_count, config.max_obstacle_size, rng)
        }
        EnvironmentLayout::Maze => build_maze(&mut grid, complexity, rng),
        EnvironmentLayout::Office => build_office(&mut grid, complexity, rng),
        EnvironmentLayout::Warehouse => build_warehouse(&mut grid, complexity),
        EnvironmentLayout::Outdoor => build_outdoor(
            &mut grid,
            config.obstacle_count,
            config.max_obstacle_size,
            complexity,
            rng,
        ),
    }

    // Layouts may carve into the walls
    grid.apply_boundary(thickness);

    debug!(
        "Generated {} environment {}x{} ({:.1}% occupied)",
        config.layout,
        config.size,
        config.size,
        grid.occupied_ratio() * 100.0
    );

    grid
}

fn place_random_obstacles<R: Rng + ?Sized>(
    grid: &mut Grid,
    obstacle_count: usize,
    max_obstacle_size: usize,
    rng: &mut R,
) {
    if obstacle_count == 0 {
        return;
    }

    let max_size = max_obstacle_size.max(MIN_OBSTACLE_SIZE);
    let anchor_end = grid.size().saturating_sub(max_size.saturating_add(OBSTACLE_MARGIN));
    if anchor_end <= OBSTACLE_MARGIN {
        warn!(
            "Grid of size {} leaves no room for obstacles up to {} cells; placing none",
            grid.size(),
            max_size
        );
        return;
    }

    for _ in 0..obstacle_count {
        let x = rng.gen_range(OBSTACLE_MARGIN..anchor_end);
        let y = rng.gen_range(OBSTACLE_MARGIN..anchor_end);
        let width = rng.gen_range(MIN_OBSTACLE_SIZE..=max_size);
        let height = rng.gen_range(MIN_OBSTACLE_SIZE..=max_size);
        grid.fill_rect(x as i64, y as i64, width, height, Cell::Occupied);
    }
}

/// Horizontal walls, each with one random gap
fn build_maze<R: Rng + ?Sized>(grid: &mut Grid, complexity: usize, rng: &mut R) {
    let n = grid.size();
    let step = 20usize.saturating_sub(complexity).max(8);
    let wall_end = n.saturating_sub(10);

    for row in (10..wall_end).step_by(step) {
        grid.fill_rect(10, row as i64, wall_end - 10, 1, Cell::Occupied);

        let gap_hi = n.saturating_sub(25);
        let gap_start = if gap_hi >= 15 {
            rng.gen_range(15..=gap_hi)
        } else {
            n / 2
        };
        let gap_width = rng.gen_range(5..=15);
        grid.fill_rect(gap_start as i64, row as i64, gap_width, 1, Cell::Free);
    }
}

/// L-shaped rooms with a door in the top wall
fn build_office<R: Rng + ?Sized>(grid: &mut Grid, complexity: usize, rng: &mut R) {
    let n = grid.size();
    let room = 30usize.saturating_sub(complexity * 2).max(9);
    let band = room / 3;
    let end = n.saturating_sub(15);

    for top in (15..end).step_by(room) {
        for left in (15..end).step_by(room) {
            grid.fill_rect(left as i64, top as i64, room, band, Cell::Occupied);
            grid.fill_rect(left as i64, top as i64, band, room, Cell::Occupied);

            let door = rng.gen_range(left + 3..=left + room - 3);
            grid.fill_rect(door as i64, top as i64, 3, 1, Cell::Free);
        }
    }
}

/// Three-row shelves, each followed by a cleared aisle
fn build_warehouse(grid: &mut Grid, complexity: usize) {
    let n = grid.size();
    let spacing = 25usize.saturating_sub(complexity).max(10);
    let span_end = n.saturating_sub(15);
    if span_end <= 15 {
        return;
    }

    for row in (20..n.saturating_sub(20)).step_by(spacing) {
        grid.fill_rect(15, row as i64, span_end - 15, 3, Cell::Occupied);
        grid.fill_rect(15, row as i64 + 3, span_end - 15, 5, Cell::Free);
    }
}

/// Scattered discs (trees, rocks)
fn build_outdoor<R: Rng + ?Sized>(
    grid: &mut Grid,
    obstacle_count: usize,
    max_obstacle_size: usize,
    complexity: usize,
    rng: &mut R,
) {
    let n = grid.size();
    if n <= 20 {
        return;
    }

    let count = (obstacle_count as f64 * (1.5 + complexity as f64 * 0.2)) as usize;
    let max_radius = max_obstacle_size.clamp(2, n / 2) as i64;

    for _ in 0..count {
        let cx = rng.gen_range(10..n - 10) as i64;
        let cy = rng.gen_range(10..n - 10) as i64;
        let radius = rng.gen_range(2..=max_radius);

        for y in (cy - radius)..(cy + radius) {
            for x in (cx - radius)..(cx + radius) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= radius * radius {
                    grid.set_occupied(x, y);
                }
            }
        }
    }
}

/// Coarse difficulty class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

/// Environment characteristics estimated from its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentAssessment {
    /// Estimated fraction of the grid covered by obstacles
    pub obstacle_coverage: f64,
    pub path_complexity: f64,
    pub difficulty: Difficulty,
}

impl EnvironmentAssessment {
    pub fn estimate(size: usize, obstacle_count: usize, max_obstacle_size: usize) -> Self {
        let size = size.max(1) as f64;
        let count = obstacle_count as f64;
        let obstacle = max_obstacle_size as f64;

        let obstacle_coverage = count * obstacle * obstacle / (size * size);
        let path_complexity = (count + 1.0).ln() * obstacle / size;

        let difficulty = if obstacle_coverage < 0.2 {
            Difficulty::Easy
        } else if obstacle_coverage < 0.4 {
            Difficulty::Moderate
        } else {
            Difficulty::Hard
        };

        Self {
            obstacle_coverage,
            path_complexity,
            difficulty,
        }
    }
}
