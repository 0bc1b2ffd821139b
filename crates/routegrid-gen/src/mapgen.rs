//! World grid generation and random position queries.

use rand::{Rng, RngExt};
use routegrid_core::{Point, Range};
use routegrid_paths::{GridError, WeightedGrid};

use crate::mapdef::MapDefinition;
use crate::noise::NoiseField;

/// Grid generator driven by a random source.
pub struct MapGen<R: Rng> {
    pub rng: R,
}

impl<R: Rng> MapGen<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Generate a grid covering `0..width × 0..height`.
    ///
    /// Each cell samples a freshly seeded noise field; the matching floor
    /// band supplies its cost. Cells whose noise matches no band are left
    /// out of the grid, which makes them impassable.
    pub fn generate(&mut self, def: &MapDefinition) -> Result<WeightedGrid, GridError> {
        let field = NoiseField::from_rng(&mut self.rng, def.noise.clone());
        let mut grid = WeightedGrid::new();
        let mut skipped = 0usize;
        for p in Range::new(0, 0, def.width, def.height) {
            let noise = field.sample(p.x as f64, p.y as f64);
            match def.band_for(noise) {
                Some(band) => {
                    grid.insert(p, band.cost)?;
                }
                None => skipped += 1,
            }
        }
        log::debug!(
            "generated {}x{} grid (seed {}): {} traversable, {} impassable",
            def.width,
            def.height,
            field.seed(),
            grid.len(),
            skipped
        );
        Ok(grid)
    }
}

/// A uniformly random traversable cell, or `None` for an empty grid.
pub fn random_position(grid: &WeightedGrid, rng: &mut impl Rng) -> Option<Point> {
    let cells = grid.positions();
    if cells.is_empty() {
        return None;
    }
    Some(cells[rng.random_range(0..cells.len())])
}

/// A random traversable cell other than `center` within Euclidean
/// `distance` of it.
///
/// When no cell lies within range, the nearest other cell is returned
/// instead. `center` itself comes back for an empty grid, a non-positive
/// `distance`, or a grid with no other cell.
pub fn random_position_near(
    grid: &WeightedGrid,
    center: Point,
    distance: i32,
    rng: &mut impl Rng,
) -> Point {
    if grid.is_empty() || distance <= 0 {
        return center;
    }

    let max_sq = i64::from(distance) * i64::from(distance);
    let candidates: Vec<Point> = grid
        .positions()
        .iter()
        .copied()
        .filter(|p| *p != center && p.distance_squared(center) <= max_sq)
        .collect();

    if candidates.is_empty() {
        return grid
            .positions()
            .iter()
            .copied()
            .filter(|p| *p != center)
            .min_by_key(|p| p.distance_squared(center))
            .unwrap_or(center);
    }
    candidates[rng.random_range(0..candidates.len())]
}
