use routegrid_core::Point;

/// Minimal pathfinding interface: neighbour enumeration.
pub trait Pather {
    /// Append the traversable neighbours of `p` into `buf`, in a fixed order.
    /// The caller clears `buf` before calling.
    fn neighbors(&self, p: Point, buf: &mut Vec<Point>);
}

/// Pather whose cells carry a positive cost for entering them.
pub trait WeightedPather: Pather {
    /// Cost of entering `p`, or `None` if `p` is impassable.
    fn cost(&self, p: Point) -> Option<f64>;
}

/// Weighted pather with an admissible heuristic.
pub trait AstarPather: WeightedPather {
    /// Estimated cost of travelling from `from` to `to`.
    /// Must never overestimate the true cost (admissible).
    fn estimate(&self, from: Point, to: Point) -> f64;
}
