//! Heuristic-guided (A*-style) search.
//!
//! The frontier starts as `{start}` and grows lazily: a coordinate joins the
//! open set only when a relaxation improves it. The search stops the moment
//! the goal is popped.

use std::collections::{BinaryHeap, HashMap, HashSet};

use routegrid_core::Point;

use crate::node::{Expansion, NodeRef, reconstruct};
use crate::traits::AstarPather;

/// Working tables of one heuristic-guided search.
#[derive(Debug)]
pub(crate) struct HeuristicState {
    dist: HashMap<Point, f64>,
    estimated: HashMap<Point, f64>,
    parent: HashMap<Point, Point>,
    open_set: HashSet<Point>,
    open: BinaryHeap<NodeRef>,
    nbuf: Vec<Point>,
}

impl HeuristicState {
    pub(crate) fn new<P: AstarPather>(pather: &P, start: Point, end: Point) -> Self {
        let f = pather.estimate(start, end);
        let mut dist = HashMap::new();
        dist.insert(start, 0.0);
        let mut estimated = HashMap::new();
        estimated.insert(start, f);
        let mut open_set = HashSet::new();
        open_set.insert(start);
        let mut open = BinaryHeap::new();
        open.push(NodeRef { key: f, pos: start });
        Self {
            dist,
            estimated,
            parent: HashMap::new(),
            open_set,
            open,
            nbuf: Vec::with_capacity(4),
        }
    }

    /// Expand up to `budget` open-set members. Each expansion adds one to
    /// `iterations`.
    pub(crate) fn expand<P: AstarPather>(
        &mut self,
        pather: &P,
        end: Point,
        budget: usize,
        iterations: &mut usize,
    ) -> Expansion {
        let mut used = 0;
        while used < budget {
            let Some(current) = self.pop_open() else {
                return Expansion::Exhausted;
            };
            used += 1;
            *iterations += 1;

            if current == end {
                return Expansion::Reached;
            }
            self.open_set.remove(&current);

            let current_g = self.dist[&current];
            self.nbuf.clear();
            pather.neighbors(current, &mut self.nbuf);
            for &np in &self.nbuf {
                let Some(step) = pather.cost(np) else {
                    continue;
                };
                let tentative = current_g + step;
                let known = self.dist.get(&np).copied().unwrap_or(f64::INFINITY);
                if tentative >= known {
                    continue;
                }
                let f = tentative + pather.estimate(np, end);
                self.dist.insert(np, tentative);
                self.estimated.insert(np, f);
                self.parent.insert(np, current);
                self.open_set.insert(np);
                self.open.push(NodeRef { key: f, pos: np });
            }
        }
        Expansion::Paused
    }

    /// Pop the open-set member with the smallest estimated total, skipping
    /// entries superseded by a later improvement.
    fn pop_open(&mut self) -> Option<Point> {
        while let Some(node) = self.open.pop() {
            if !self.open_set.contains(&node.pos) {
                continue;
            }
            if self.estimated.get(&node.pos).is_some_and(|f| *f < node.key) {
                continue;
            }
            return Some(node.pos);
        }
        None
    }

    pub(crate) fn path_to(&self, end: Point) -> Vec<Point> {
        reconstruct(&self.parent, end)
    }
}
