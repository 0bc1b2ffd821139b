//! The weighted grid searched by every algorithm in this crate.

use std::collections::HashMap;
use std::fmt;

use routegrid_core::{Point, Range};

use crate::distance::manhattan;
use crate::traits::{AstarPather, Pather, WeightedPather};

/// A sparse mapping from grid coordinate to traversal cost.
///
/// A coordinate present in the grid is traversable; an absent coordinate is
/// impassable. Connectivity is 4-directional. Once built, share the grid as
/// `Rc<WeightedGrid>` so that running computations only ever read it.
#[derive(Debug, Clone)]
pub struct WeightedGrid {
    costs: HashMap<Point, f64>,
    /// Coordinates in insertion order, for deterministic iteration.
    order: Vec<Point>,
    bounds: Range,
    min_cost: f64,
}

impl WeightedGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self {
            costs: HashMap::new(),
            order: Vec::new(),
            bounds: Range::default(),
            min_cost: f64::INFINITY,
        }
    }

    /// Build a grid from `(coordinate, cost)` pairs.
    ///
    /// Later pairs overwrite earlier ones for the same coordinate.
    pub fn from_cells<I>(cells: I) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = (Point, f64)>,
    {
        let mut grid = Self::new();
        for (p, cost) in cells {
            grid.insert(p, cost)?;
        }
        Ok(grid)
    }

    /// Build a rectangular grid where every cell of `rng` has the same cost.
    pub fn uniform(rng: Range, cost: f64) -> Result<Self, GridError> {
        Self::from_cells(rng.iter().map(|p| (p, cost)))
    }

    /// Make `p` traversable with the given entering cost.
    ///
    /// Returns the previous cost if `p` was already present. The cost must
    /// be finite and strictly positive.
    pub fn insert(&mut self, p: Point, cost: f64) -> Result<Option<f64>, GridError> {
        if !cost.is_finite() || cost <= 0.0 {
            return Err(GridError::InvalidCost { pos: p, cost });
        }
        let previous = self.costs.insert(p, cost);
        match previous {
            Some(old) => {
                if old <= self.min_cost {
                    // The old minimum may have been this cell.
                    self.min_cost = self.costs.values().copied().fold(f64::INFINITY, f64::min);
                } else {
                    self.min_cost = self.min_cost.min(cost);
                }
            }
            None => {
                self.order.push(p);
                self.bounds = self.bounds.grow_to(p);
                self.min_cost = self.min_cost.min(cost);
            }
        }
        Ok(previous)
    }

    /// Cost of entering `p`, or `None` if `p` is impassable.
    #[inline]
    pub fn cost(&self, p: Point) -> Option<f64> {
        self.costs.get(&p).copied()
    }

    /// Whether `p` is traversable.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.costs.contains_key(&p)
    }

    /// Traversable orthogonal neighbours of `p`, in `+x, -x, +y, -y` order.
    pub fn adjacent(&self, p: Point) -> impl Iterator<Item = Point> + '_ {
        p.neighbors_4().into_iter().filter(|n| self.contains(*n))
    }

    /// Number of traversable cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the grid has no traversable cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over `(coordinate, cost)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Point, f64)> + '_ {
        self.order.iter().map(|p| (*p, self.costs[p]))
    }

    /// Iterate over traversable coordinates in insertion order.
    pub fn positions(&self) -> &[Point] {
        &self.order
    }

    /// Smallest rectangle enclosing every traversable cell.
    #[inline]
    pub fn bounds(&self) -> Range {
        self.bounds
    }

    /// Smallest cell cost, or `None` for an empty grid.
    pub fn min_cost(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.min_cost)
        }
    }

    /// Factor applied to the Manhattan estimate so that it never exceeds the
    /// true remaining cost. Equals 1 whenever every cost is at least 1.
    #[inline]
    fn heuristic_scale(&self) -> f64 {
        self.min_cost.min(1.0)
    }
}

impl Default for WeightedGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl Pather for WeightedGrid {
    fn neighbors(&self, p: Point, buf: &mut Vec<Point>) {
        buf.extend(self.adjacent(p));
    }
}

impl WeightedPather for WeightedGrid {
    #[inline]
    fn cost(&self, p: Point) -> Option<f64> {
        WeightedGrid::cost(self, p)
    }
}

impl AstarPather for WeightedGrid {
    #[inline]
    fn estimate(&self, from: Point, to: Point) -> f64 {
        manhattan(from, to) as f64 * self.heuristic_scale()
    }
}

impl FromIterator<(Point, f64)> for WeightedGrid {
    /// Collect pairs into a grid, skipping pairs with an invalid cost.
    fn from_iter<I: IntoIterator<Item = (Point, f64)>>(iter: I) -> Self {
        let mut grid = Self::new();
        for (p, cost) in iter {
            if let Err(e) = grid.insert(p, cost) {
                log::warn!("skipping cell: {e}");
            }
        }
        grid
    }
}

/// Errors raised while building a [`WeightedGrid`].
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// A traversal cost was zero, negative, infinite or NaN.
    InvalidCost { pos: Point, cost: f64 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCost { pos, cost } => {
                write!(f, "invalid traversal cost {cost} at {pos}: must be finite and > 0")
            }
        }
    }
}

impl std::error::Error for GridError {}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct CellEntry {
    pos: Point,
    cost: f64,
}

#[cfg(feature = "serde")]
impl serde::Serialize for WeightedGrid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for (pos, cost) in self.iter() {
            seq.serialize_element(&CellEntry { pos, cost })?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for WeightedGrid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = Vec::<CellEntry>::deserialize(deserializer)?;
        WeightedGrid::from_cells(cells.into_iter().map(|c| (c.pos, c.cost)))
            .map_err(serde::de::Error::custom)
    }
}
