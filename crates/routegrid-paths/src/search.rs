//! Algorithm selection, the resumable [`Search`], and the blocking
//! [`PathFinder`] entry point.

use std::fmt;

use routegrid_core::Point;

use crate::heuristic::HeuristicState;
use crate::node::Expansion;
use crate::traits::{AstarPather, WeightedPather};
use crate::uniform::UniformState;

/// Which shortest-path algorithm a search runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// Dijkstra-style search, settling coordinates by accumulated cost.
    #[default]
    UniformCost,
    /// A*-style search guided by a Manhattan estimate to the goal.
    HeuristicGuided,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniformCost => f.write_str("uniform-cost"),
            Self::HeuristicGuided => f.write_str("heuristic-guided"),
        }
    }
}

/// Result of advancing a search by one bounded step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The budget ran out; call `step` again to continue.
    Continue,
    /// The search terminated. The path runs from start to end inclusive,
    /// or is empty when the end is unreachable.
    Completed(Vec<Point>),
    /// The start or end coordinate is not in the grid.
    Failed,
    /// The computation was cancelled before it terminated.
    Cancelled,
}

impl Step {
    /// Whether this result ends the computation.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }

    /// The path carried by a terminal result: the route for
    /// [`Completed`](Self::Completed), empty for failure or cancellation,
    /// `None` while the search is still running.
    pub fn into_path(self) -> Option<Vec<Point>> {
        match self {
            Self::Continue => None,
            Self::Completed(path) => Some(path),
            Self::Failed | Self::Cancelled => Some(Vec::new()),
        }
    }
}

#[derive(Debug)]
enum Phase {
    Unstarted,
    Uniform(UniformState),
    Heuristic(HeuristicState),
    Finished,
}

/// A resumable shortest-path search between two coordinates.
///
/// The search holds only its private working tables; the grid is passed to
/// every [`step`](Self::step) call and must not change between calls.
/// Stepping is purely iteration-driven: the same inputs always yield the
/// same path and the same iteration count, however the budget is split.
#[derive(Debug)]
pub struct Search {
    start: Point,
    end: Point,
    algorithm: Algorithm,
    iterations: usize,
    phase: Phase,
}

impl Search {
    /// Prepare a search. No work happens until the first `step`.
    pub fn new(start: Point, end: Point, algorithm: Algorithm) -> Self {
        Self {
            start,
            end,
            algorithm,
            iterations: 0,
            phase: Phase::Unstarted,
        }
    }

    /// Advance by at most `budget` iterations (coordinates expanded).
    ///
    /// A terminal condition reached inside the budget is reported
    /// immediately. Endpoint validation and the `start == end` shortcut
    /// consume no budget.
    ///
    /// # Panics
    ///
    /// Panics if `budget` is zero, or if called again after a terminal
    /// result was returned.
    pub fn step<P: AstarPather>(&mut self, pather: &P, budget: usize) -> Step {
        assert!(budget > 0, "step budget must be positive");

        if let Phase::Unstarted = self.phase {
            if pather.cost(self.start).is_none() || pather.cost(self.end).is_none() {
                self.phase = Phase::Finished;
                return Step::Failed;
            }
            if self.start == self.end {
                self.phase = Phase::Finished;
                return Step::Completed(vec![self.start]);
            }
            self.phase = match self.algorithm {
                Algorithm::UniformCost => Phase::Uniform(UniformState::new(self.start)),
                Algorithm::HeuristicGuided => {
                    Phase::Heuristic(HeuristicState::new(pather, self.start, self.end))
                }
            };
        }

        let (expansion, path) = match &mut self.phase {
            Phase::Uniform(state) => {
                let e = state.expand(pather, self.end, budget, &mut self.iterations);
                (e, (e == Expansion::Reached).then(|| state.path_to(self.end)))
            }
            Phase::Heuristic(state) => {
                let e = state.expand(pather, self.end, budget, &mut self.iterations);
                (e, (e == Expansion::Reached).then(|| state.path_to(self.end)))
            }
            Phase::Unstarted | Phase::Finished => panic!("step called on a finished search"),
        };

        match expansion {
            Expansion::Paused => Step::Continue,
            Expansion::Reached => {
                self.phase = Phase::Finished;
                Step::Completed(path.unwrap_or_default())
            }
            Expansion::Exhausted => {
                self.phase = Phase::Finished;
                Step::Completed(Vec::new())
            }
        }
    }

    /// Drop the working tables; further `step` calls panic.
    pub(crate) fn discard(&mut self) {
        self.phase = Phase::Finished;
    }

    /// Total iterations consumed so far.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether a terminal result has been returned.
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    #[inline]
    pub fn start(&self) -> Point {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Point {
        self.end
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

/// Stateless entry point to both algorithms.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFinder;

impl PathFinder {
    /// Compute a route in one blocking call.
    ///
    /// Returns the path from `start` to `end` inclusive, or an empty vector
    /// when no route exists or either endpoint is not in the grid.
    pub fn find_path<P: AstarPather>(
        pather: &P,
        start: Point,
        end: Point,
        algorithm: Algorithm,
    ) -> Vec<Point> {
        let mut search = Self::search(start, end, algorithm);
        loop {
            if let Some(path) = search.step(pather, usize::MAX).into_path() {
                return path;
            }
        }
    }

    /// Prepare an incremental search; see [`Search::step`].
    pub fn search(start: Point, end: Point, algorithm: Algorithm) -> Search {
        Search::new(start, end, algorithm)
    }
}

/// Summed entering cost of `path` (the first cell is free).
///
/// Returns `None` if a cell is impassable or two consecutive cells are not
/// orthogonally adjacent, and for an empty path.
pub fn path_cost<P: WeightedPather>(pather: &P, path: &[Point]) -> Option<f64> {
    let first = path.first()?;
    pather.cost(*first)?;
    let mut total = 0.0;
    for pair in path.windows(2) {
        if !pair[0].is_adjacent_4(pair[1]) {
            return None;
        }
        total += pather.cost(pair[1])?;
    }
    Some(total)
}
