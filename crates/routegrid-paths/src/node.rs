use std::cmp::Ordering;
use std::collections::HashMap;

use routegrid_core::Point;

/// Frontier entry, ordered so that `BinaryHeap` (a max-heap) pops the
/// smallest key first and, among equal keys, the smallest point in
/// row-major order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct NodeRef {
    pub(crate) key: f64,
    pub(crate) pos: Point,
}

impl Eq for NodeRef {}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Outcome of one bounded batch of expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expansion {
    /// The budget ran out before a terminal condition.
    Paused,
    /// The goal was settled.
    Reached,
    /// Nothing left to expand; the goal is unreachable.
    Exhausted,
}

/// Walk predecessor links back from `end` and return the path in
/// traversal order.
pub(crate) fn reconstruct(parent: &HashMap<Point, Point>, end: Point) -> Vec<Point> {
    let mut path = vec![end];
    let mut cur = end;
    while let Some(&prev) = parent.get(&cur) {
        path.push(prev);
        cur = prev;
    }
    path.reverse();
    path
}
