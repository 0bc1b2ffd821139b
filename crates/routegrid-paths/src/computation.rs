//! A cancellable, resumable unit of path work bound to a shared grid.

use std::fmt;
use std::rc::Rc;

use routegrid_core::{Context, Point};

use crate::grid::WeightedGrid;
use crate::search::{Algorithm, Search, Step};

/// Lifecycle of a [`PathComputation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComputationState {
    /// Created, not yet stepped.
    Pending,
    /// Stepped at least once without reaching a terminal result.
    Running,
    /// A path was found, or the end proved unreachable.
    Completed,
    /// Cancelled before terminating.
    Cancelled,
    /// The start or end coordinate is not in the grid.
    Failed,
}

impl ComputationState {
    /// Whether no further work will happen.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for ComputationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One in-progress search over a shared, read-only [`WeightedGrid`].
///
/// Cancellation is cooperative: it is observed at the next
/// [`step`](Self::step), which then reports [`Step::Cancelled`] without
/// doing any further relaxation.
#[derive(Debug)]
pub struct PathComputation {
    grid: Rc<WeightedGrid>,
    search: Search,
    state: ComputationState,
    ctx: Context,
}

impl PathComputation {
    pub fn new(grid: Rc<WeightedGrid>, start: Point, end: Point, algorithm: Algorithm) -> Self {
        Self::with_context(grid, start, end, algorithm, Context::new())
    }

    /// Create a computation that also stops once `ctx` is cancelled.
    pub fn with_context(
        grid: Rc<WeightedGrid>,
        start: Point,
        end: Point,
        algorithm: Algorithm,
        ctx: Context,
    ) -> Self {
        Self {
            grid,
            search: Search::new(start, end, algorithm),
            state: ComputationState::Pending,
            ctx,
        }
    }

    /// Advance by at most `budget` iterations.
    ///
    /// # Panics
    ///
    /// Panics if `budget` is zero, or if the computation already completed
    /// or failed. Stepping a cancelled computation keeps returning
    /// [`Step::Cancelled`].
    pub fn step(&mut self, budget: usize) -> Step {
        assert!(budget > 0, "step budget must be positive");
        match self.state {
            ComputationState::Cancelled => return Step::Cancelled,
            ComputationState::Completed | ComputationState::Failed => {
                panic!("step called on a {} computation", self.state)
            }
            ComputationState::Pending | ComputationState::Running => {}
        }

        if self.ctx.is_done() {
            self.abandon();
            return Step::Cancelled;
        }

        self.state = ComputationState::Running;
        let step = self.search.step(self.grid.as_ref(), budget);
        match &step {
            Step::Continue => {
                log::trace!(
                    "{} search {} -> {}: {} iterations so far",
                    self.search.algorithm(),
                    self.search.start(),
                    self.search.end(),
                    self.search.iterations()
                );
            }
            Step::Completed(path) => {
                self.state = ComputationState::Completed;
                log::trace!(
                    "{} search {} -> {} completed after {} iterations ({} cells)",
                    self.search.algorithm(),
                    self.search.start(),
                    self.search.end(),
                    self.search.iterations(),
                    path.len()
                );
            }
            Step::Failed => self.state = ComputationState::Failed,
            Step::Cancelled => self.abandon(),
        }
        step
    }

    /// Cancel the computation and discard its working tables.
    ///
    /// Has no effect once the computation has terminated.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.ctx.cancel();
        self.abandon();
    }

    fn abandon(&mut self) {
        self.search.discard();
        self.state = ComputationState::Cancelled;
    }

    #[inline]
    pub fn state(&self) -> ComputationState {
        self.state
    }

    /// Iterations consumed so far.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.search.iterations()
    }

    /// The cancellation token observed by this computation.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    #[inline]
    pub fn start(&self) -> Point {
        self.search.start()
    }

    #[inline]
    pub fn end(&self) -> Point {
        self.search.end()
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.search.algorithm()
    }

    pub fn grid(&self) -> &Rc<WeightedGrid> {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routegrid_core::Range;

    fn grid(w: i32, h: i32) -> Rc<WeightedGrid> {
        Rc::new(WeightedGrid::uniform(Range::new(0, 0, w, h), 1.0).unwrap())
    }

    fn run(c: &mut PathComputation, budget: usize) -> (Step, usize) {
        let mut calls = 0;
        loop {
            calls += 1;
            let s = c.step(budget);
            if s.is_terminal() {
                return (s, calls);
            }
        }
    }

    #[test]
    fn lifecycle_reaches_completed() {
        let g = grid(20, 20);
        let mut c = PathComputation::new(g, Point::new(0, 0), Point::new(19, 19), Algorithm::UniformCost);
        assert_eq!(c.state(), ComputationState::Pending);
        assert_eq!(c.step(5), Step::Continue);
        assert_eq!(c.state(), ComputationState::Running);
        assert_eq!(c.iterations(), 5);
        let (step, _) = run(&mut c, 100);
        let path = step.into_path().unwrap();
        assert_eq!(path.len(), 39);
        assert_eq!(c.state(), ComputationState::Completed);
    }

    #[test]
    fn step_budget_split_is_invisible() {
        let g = grid(25, 25);
        for algo in [Algorithm::UniformCost, Algorithm::HeuristicGuided] {
            let mut a = PathComputation::new(g.clone(), Point::new(3, 0), Point::new(20, 24), algo);
            let mut b = PathComputation::new(g.clone(), Point::new(3, 0), Point::new(20, 24), algo);
            let (sa, _) = run(&mut a, 1000);
            let (sb, _) = run(&mut b, 100);
            assert_eq!(sa, sb);
            assert_eq!(a.iterations(), b.iterations());
        }
    }

    #[test]
    fn budget_bounds_each_step() {
        let g = grid(30, 30);
        let mut c = PathComputation::new(g, Point::new(0, 0), Point::new(29, 29), Algorithm::UniformCost);
        let mut prev = 0;
        loop {
            let s = c.step(100);
            assert!(c.iterations() - prev <= 100);
            prev = c.iterations();
            if s.is_terminal() {
                break;
            }
        }
        assert!(prev > 100);
    }

    #[test]
    fn cancel_short_circuits_next_step() {
        let g = grid(30, 30);
        let mut c = PathComputation::new(g, Point::new(0, 0), Point::new(29, 29), Algorithm::HeuristicGuided);
        assert_eq!(c.step(10), Step::Continue);
        let done = c.iterations();
        c.cancel();
        assert_eq!(c.state(), ComputationState::Cancelled);
        assert_eq!(c.step(10), Step::Cancelled);
        assert_eq!(c.step(10), Step::Cancelled);
        assert_eq!(c.iterations(), done);
    }

    #[test]
    fn external_context_cancels() {
        let g = grid(10, 10);
        let ctx = Context::new();
        let mut c = PathComputation::with_context(
            g,
            Point::new(0, 0),
            Point::new(9, 9),
            Algorithm::UniformCost,
            ctx.clone(),
        );
        ctx.cancel();
        assert_eq!(c.step(100), Step::Cancelled);
        assert_eq!(c.iterations(), 0);
        assert_eq!(c.state(), ComputationState::Cancelled);
    }

    #[test]
    fn invalid_endpoint_fails_fast() {
        let g = grid(3, 3);
        let mut c = PathComputation::new(g, Point::new(0, 0), Point::new(7, 7), Algorithm::UniformCost);
        assert_eq!(c.step(1), Step::Failed);
        assert_eq!(c.state(), ComputationState::Failed);
        assert_eq!(c.iterations(), 0);
    }

    #[test]
    fn cancel_after_completion_is_ignored() {
        let g = grid(3, 3);
        let c0 = Point::new(1, 1);
        let mut c = PathComputation::new(g, c0, c0, Algorithm::HeuristicGuided);
        assert_eq!(c.step(1), Step::Completed(vec![c0]));
        c.cancel();
        assert_eq!(c.state(), ComputationState::Completed);
        assert!(!c.context().is_done());
    }
}
