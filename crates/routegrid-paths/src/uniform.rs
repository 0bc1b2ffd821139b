//! Uniform-cost (Dijkstra-style) search.
//!
//! Coordinates are settled in order of accumulated cost. Unreached
//! coordinates have an implicit distance of +∞ and are never selected, so the
//! frontier only holds coordinates that have been relaxed at least once.

use std::collections::{BinaryHeap, HashMap, HashSet};

use routegrid_core::Point;

use crate::node::{Expansion, NodeRef, reconstruct};
use crate::traits::WeightedPather;

/// Working tables of one uniform-cost search.
#[derive(Debug)]
pub(crate) struct UniformState {
    dist: HashMap<Point, f64>,
    parent: HashMap<Point, Point>,
    settled: HashSet<Point>,
    open: BinaryHeap<NodeRef>,
    nbuf: Vec<Point>,
}

impl UniformState {
    pub(crate) fn new(start: Point) -> Self {
        let mut dist = HashMap::new();
        dist.insert(start, 0.0);
        let mut open = BinaryHeap::new();
        open.push(NodeRef { key: 0.0, pos: start });
        Self {
            dist,
            parent: HashMap::new(),
            settled: HashSet::new(),
            open,
            nbuf: Vec::with_capacity(4),
        }
    }

    /// Settle up to `budget` coordinates. Each settled coordinate adds one
    /// to `iterations`.
    pub(crate) fn expand<P: WeightedPather>(
        &mut self,
        pather: &P,
        end: Point,
        budget: usize,
        iterations: &mut usize,
    ) -> Expansion {
        let mut used = 0;
        while used < budget {
            let Some(current) = self.pop_unsettled() else {
                return Expansion::Exhausted;
            };
            self.settled.insert(current.pos);
            used += 1;
            *iterations += 1;

            if current.pos == end {
                return Expansion::Reached;
            }

            self.nbuf.clear();
            pather.neighbors(current.pos, &mut self.nbuf);
            for &np in &self.nbuf {
                if self.settled.contains(&np) {
                    continue;
                }
                let Some(step) = pather.cost(np) else {
                    continue;
                };
                let tentative = current.key + step;
                let known = self.dist.get(&np).copied().unwrap_or(f64::INFINITY);
                if tentative < known {
                    self.dist.insert(np, tentative);
                    self.parent.insert(np, current.pos);
                    self.open.push(NodeRef {
                        key: tentative,
                        pos: np,
                    });
                }
            }
        }
        Expansion::Paused
    }

    /// Pop the cheapest coordinate not yet settled, skipping stale entries.
    fn pop_unsettled(&mut self) -> Option<NodeRef> {
        while let Some(node) = self.open.pop() {
            if self.settled.contains(&node.pos) {
                continue;
            }
            if self.dist.get(&node.pos).is_some_and(|d| *d < node.key) {
                continue;
            }
            return Some(node);
        }
        None
    }

    pub(crate) fn path_to(&self, end: Point) -> Vec<Point> {
        reconstruct(&self.parent, end)
    }
}
