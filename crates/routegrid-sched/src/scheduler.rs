//! The admission queue and tick loop.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use routegrid_core::Point;
use routegrid_paths::{Algorithm, PathComputation, Step, WeightedGrid};

use crate::config::{ConfigError, OverflowPolicy, SchedulerConfig};
use crate::request::{PathRequest, RequestHandle, RequestId, RequestState};

/// Running totals kept by a [`Scheduler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerStats {
    /// Requests accepted by `submit`.
    pub submitted: u64,
    /// Requests finished with a computed result (possibly an empty path).
    pub completed: u64,
    /// Requests whose start or end was not in the grid.
    pub failed: u64,
    /// Requests withdrawn or dropped from a full queue.
    pub cancelled: u64,
    /// Submissions refused because the queue was full.
    pub rejected: u64,
}

/// Why [`Scheduler::submit`] refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The bounded queue is full and the policy is
    /// [`OverflowPolicy::Reject`].
    QueueFull { capacity: usize },
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull { capacity } => {
                write!(f, "path request queue is full ({capacity} pending)")
            }
        }
    }
}

impl std::error::Error for SubmitError {}

struct Active {
    request: PathRequest,
    computation: PathComputation,
}

/// FIFO admission queue plus a bounded set of running computations.
///
/// The scheduler is owned by the host application and driven by
/// [`tick`](Self::tick). All queue and slot mutation happens inside
/// `submit`, `cancel` and `tick`, on the caller's thread.
pub struct Scheduler {
    grid: Rc<WeightedGrid>,
    config: SchedulerConfig,
    queue: VecDeque<PathRequest>,
    active: Vec<Active>,
    next_id: u64,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Create a scheduler over `grid`.
    pub fn new(grid: Rc<WeightedGrid>, config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            grid,
            config,
            queue: VecDeque::new(),
            active: Vec::new(),
            next_id: 0,
            stats: SchedulerStats::default(),
        })
    }

    /// Queue a route request.
    ///
    /// `on_complete` fires exactly once, from inside a later
    /// [`tick`](Self::tick) or [`cancel`](Self::cancel), with the route or an
    /// empty vector. A refused submission never calls it.
    pub fn submit<F>(
        &mut self,
        start: Point,
        end: Point,
        algorithm: Algorithm,
        on_complete: F,
    ) -> Result<RequestHandle, SubmitError>
    where
        F: FnOnce(Vec<Point>) + 'static,
    {
        if let Some(capacity) = self.config.max_queue {
            if self.queue.len() >= capacity {
                let dropped = match self.config.overflow {
                    OverflowPolicy::DropOldest => self.queue.pop_front(),
                    OverflowPolicy::Reject => None,
                };
                let Some(oldest) = dropped else {
                    self.stats.rejected += 1;
                    return Err(SubmitError::QueueFull { capacity });
                };
                log::warn!("queue full, dropping oldest request {}", oldest.id);
                self.stats.cancelled += 1;
                oldest.finish(RequestState::Cancelled, Vec::new());
            }
        }

        let id = RequestId(self.next_id);
        self.next_id += 1;
        let (req, handle) = PathRequest::new(id, start, end, algorithm, Box::new(on_complete));
        log::debug!("request {id} queued: {algorithm} {start} -> {end}");
        self.queue.push_back(req);
        self.stats.submitted += 1;
        Ok(handle)
    }

    /// Cancel a request by id.
    ///
    /// A pending request is removed and its callback fires immediately. A
    /// running request stops at the next tick, which fires its callback.
    /// Returns `false` if the id is unknown or already finished.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        if let Some(pos) = self.queue.iter().position(|r| r.id == id) {
            if let Some(req) = self.queue.remove(pos) {
                log::debug!("request {id} cancelled while pending");
                self.stats.cancelled += 1;
                req.finish(RequestState::Cancelled, Vec::new());
                return true;
            }
        }
        if let Some(a) = self.active.iter_mut().find(|a| a.request.id == id) {
            a.computation.cancel();
            return true;
        }
        false
    }

    /// Run one scheduling cycle.
    ///
    /// In order: drop pending requests whose handle was cancelled; admit
    /// queued requests in FIFO order while slots are free; step every
    /// running computation once. Slots freed during this tick are refilled
    /// on the next one. Returns the number of callbacks fired.
    pub fn tick(&mut self) -> usize {
        let mut delivered = self.purge_cancelled();

        while self.active.len() < self.config.max_concurrency {
            let Some(req) = self.queue.pop_front() else {
                break;
            };
            log::debug!("request {} admitted", req.id);
            req.mark_running();
            let computation = PathComputation::with_context(
                self.grid.clone(),
                req.start,
                req.end,
                req.algorithm,
                req.ctx.clone(),
            );
            self.active.push(Active {
                request: req,
                computation,
            });
        }

        let budget = self.config.step_budget;
        let mut i = 0;
        while i < self.active.len() {
            let step = self.active[i].computation.step(budget);
            if !step.is_terminal() {
                i += 1;
                continue;
            }
            let Active {
                request,
                computation,
            } = self.active.remove(i);
            let (state, path) = match step {
                Step::Completed(path) => {
                    self.stats.completed += 1;
                    (RequestState::Completed, path)
                }
                Step::Failed => {
                    self.stats.failed += 1;
                    (RequestState::Failed, Vec::new())
                }
                Step::Cancelled | Step::Continue => {
                    self.stats.cancelled += 1;
                    (RequestState::Cancelled, Vec::new())
                }
            };
            log::debug!(
                "request {} {:?} after {} iterations ({} cells)",
                request.id,
                state,
                computation.iterations(),
                path.len()
            );
            request.finish(state, path);
            delivered += 1;
        }

        delivered
    }

    /// Tick until nothing is queued or running, up to `max_ticks` times.
    /// Returns the number of ticks performed.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while !self.is_idle() && ticks < max_ticks {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    fn purge_cancelled(&mut self) -> usize {
        if !self.queue.iter().any(PathRequest::is_cancel_requested) {
            return 0;
        }
        let (cancelled, kept): (VecDeque<_>, VecDeque<_>) = self
            .queue
            .drain(..)
            .partition(PathRequest::is_cancel_requested);
        self.queue = kept;
        let n = cancelled.len();
        for req in cancelled {
            log::debug!("request {} cancelled while pending", req.id);
            self.stats.cancelled += 1;
            req.finish(RequestState::Cancelled, Vec::new());
        }
        n
    }

    /// Requests waiting for a slot.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Computations currently running.
    #[inline]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Whether nothing is queued or running.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.active.is_empty()
    }

    /// Ids of running requests, in admission order.
    pub fn active_ids(&self) -> Vec<RequestId> {
        self.active.iter().map(|a| a.request.id).collect()
    }

    #[inline]
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> &Rc<WeightedGrid> {
        &self.grid
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("pending", &self.queue.len())
            .field("active", &self.active.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routegrid_core::Range;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<(&'static str, Vec<Point>)>>>;

    fn open_grid(w: i32, h: i32) -> Rc<WeightedGrid> {
        Rc::new(WeightedGrid::uniform(Range::new(0, 0, w, h), 1.0).unwrap())
    }

    fn scheduler(grid: Rc<WeightedGrid>, config: SchedulerConfig) -> Scheduler {
        Scheduler::new(grid, config).unwrap()
    }

    fn record(log: &Log, name: &'static str) -> impl FnOnce(Vec<Point>) + 'static {
        let log = log.clone();
        move |path| log.borrow_mut().push((name, path))
    }

    fn names(log: &Log) -> Vec<&'static str> {
        log.borrow().iter().map(|(n, _)| *n).collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = SchedulerConfig {
            step_budget: 0,
            ..Default::default()
        };
        assert_eq!(
            Scheduler::new(open_grid(2, 2), cfg).err(),
            Some(ConfigError::ZeroStepBudget)
        );
    }

    #[test]
    fn rejects_zero_capacity_queue() {
        for overflow in [OverflowPolicy::Reject, OverflowPolicy::DropOldest] {
            let cfg = SchedulerConfig {
                max_queue: Some(0),
                overflow,
                ..Default::default()
            };
            assert_eq!(
                Scheduler::new(open_grid(2, 2), cfg).err(),
                Some(ConfigError::ZeroQueueCapacity)
            );
        }
    }

    #[test]
    fn submit_only_queues() {
        let log = Log::default();
        let mut s = scheduler(open_grid(3, 3), SchedulerConfig::default());
        let h = s
            .submit(Point::new(0, 0), Point::new(2, 2), Algorithm::UniformCost, record(&log, "a"))
            .unwrap();
        assert_eq!(h.state(), RequestState::Pending);
        assert_eq!(s.pending_len(), 1);
        assert_eq!(s.active_len(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn three_by_three_request_completes() {
        let log = Log::default();
        let mut s = scheduler(open_grid(3, 3), SchedulerConfig::default());
        let h = s
            .submit(Point::new(0, 0), Point::new(2, 2), Algorithm::HeuristicGuided, record(&log, "a"))
            .unwrap();
        assert_eq!(s.tick(), 1);
        assert_eq!(h.state(), RequestState::Completed);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1.len(), 5);
        assert!(s.is_idle());
    }

    #[test]
    fn admission_is_fifo_with_single_slot() {
        let log = Log::default();
        let cfg = SchedulerConfig {
            step_budget: 10,
            ..Default::default()
        };
        let mut s = scheduler(open_grid(30, 30), cfg);
        // A is expensive, B and C are trivial.
        let a = s
            .submit(Point::new(0, 0), Point::new(29, 29), Algorithm::UniformCost, record(&log, "a"))
            .unwrap();
        let b = s
            .submit(Point::new(1, 1), Point::new(1, 2), Algorithm::UniformCost, record(&log, "b"))
            .unwrap();
        let c = s
            .submit(Point::new(2, 2), Point::new(2, 2), Algorithm::UniformCost, record(&log, "c"))
            .unwrap();

        s.tick();
        assert_eq!(s.active_ids(), vec![a.id()]);
        assert_eq!(a.state(), RequestState::Running);
        assert_eq!(b.state(), RequestState::Pending);

        while a.state() == RequestState::Running {
            s.tick();
            if a.state() == RequestState::Running {
                assert_eq!(b.state(), RequestState::Pending);
            }
        }
        assert_eq!(names(&log), vec!["a"]);
        // The freed slot is filled on the following tick.
        assert_eq!(b.state(), RequestState::Pending);
        s.tick();
        assert_eq!(names(&log), vec!["a", "b"]);
        assert_eq!(c.state(), RequestState::Pending);
        s.tick();
        assert_eq!(names(&log), vec!["a", "b", "c"]);
        assert!(s.is_idle());
    }

    #[test]
    fn concurrent_slots_may_complete_out_of_order() {
        let log = Log::default();
        let cfg = SchedulerConfig {
            max_concurrency: 2,
            step_budget: 5,
            ..Default::default()
        };
        let mut s = scheduler(open_grid(20, 20), cfg);
        s.submit(Point::new(0, 0), Point::new(19, 19), Algorithm::UniformCost, record(&log, "long"))
            .unwrap();
        s.submit(Point::new(4, 4), Point::new(5, 4), Algorithm::UniformCost, record(&log, "short"))
            .unwrap();
        s.submit(Point::new(0, 0), Point::new(0, 1), Algorithm::UniformCost, record(&log, "third"))
            .unwrap();

        s.tick();
        assert_eq!(s.active_len(), 1);
        assert_eq!(names(&log), vec!["short"]);
        s.tick();
        assert_eq!(s.active_len(), 1);
        assert_eq!(names(&log), vec!["short", "third"]);
        s.run_until_idle(1000);
        assert_eq!(names(&log), vec!["short", "third", "long"]);
    }

    #[test]
    fn never_exceeds_max_concurrency() {
        let cfg = SchedulerConfig {
            max_concurrency: 3,
            step_budget: 2,
            ..Default::default()
        };
        let mut s = scheduler(open_grid(10, 10), cfg);
        for i in 0..10 {
            s.submit(Point::new(0, 0), Point::new(9, i), Algorithm::HeuristicGuided, |_| {})
                .unwrap();
        }
        while !s.is_idle() {
            s.tick();
            assert!(s.active_len() <= 3);
        }
        assert_eq!(s.stats().completed, 10);
    }

    #[test]
    fn cancelling_running_request_delivers_empty_path_once() {
        let log = Log::default();
        let cfg = SchedulerConfig {
            step_budget: 1,
            ..Default::default()
        };
        let mut s = scheduler(open_grid(10, 10), cfg);
        let h = s
            .submit(Point::new(0, 0), Point::new(9, 9), Algorithm::UniformCost, record(&log, "a"))
            .unwrap();
        s.tick();
        assert_eq!(h.state(), RequestState::Running);
        h.cancel();
        assert_eq!(s.tick(), 1);
        assert_eq!(h.state(), RequestState::Cancelled);
        assert_eq!(*log.borrow(), vec![("a", Vec::new())]);
        s.tick();
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(s.stats().cancelled, 1);
    }

    #[test]
    fn cancelling_pending_request_never_starts_it() {
        let log = Log::default();
        let cfg = SchedulerConfig {
            step_budget: 1,
            ..Default::default()
        };
        let mut s = scheduler(open_grid(10, 10), cfg);
        let a = s
            .submit(Point::new(0, 0), Point::new(9, 9), Algorithm::UniformCost, record(&log, "a"))
            .unwrap();
        let b = s
            .submit(Point::new(0, 0), Point::new(1, 0), Algorithm::UniformCost, record(&log, "b"))
            .unwrap();
        let c = s
            .submit(Point::new(0, 0), Point::new(0, 1), Algorithm::UniformCost, record(&log, "c"))
            .unwrap();
        s.tick();

        b.cancel();
        assert!(s.cancel(c.id()));
        assert_eq!(c.state(), RequestState::Cancelled);
        assert_eq!(names(&log), vec!["c"]);

        s.tick();
        assert_eq!(b.state(), RequestState::Cancelled);
        assert_eq!(names(&log), vec!["c", "b"]);
        assert_eq!(s.pending_len(), 0);
        assert_eq!(s.active_ids(), vec![a.id()]);
        assert!(!s.cancel(b.id()));
    }

    #[test]
    fn purge_keeps_fifo_order_of_survivors() {
        let log = Log::default();
        let mut s = scheduler(open_grid(4, 4), SchedulerConfig::default());
        let p = Point::new(1, 1);
        let handles: Vec<RequestHandle> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|n| s.submit(p, p, Algorithm::UniformCost, record(&log, n)).unwrap())
            .collect();
        handles[0].cancel();
        handles[2].cancel();
        handles[3].cancel();

        assert_eq!(s.tick(), 4);
        assert_eq!(names(&log), vec!["a", "c", "d", "b"]);
        assert_eq!(s.pending_len(), 1);
        assert_eq!(s.stats().cancelled, 3);
        s.tick();
        assert_eq!(names(&log), vec!["a", "c", "d", "b", "e"]);
        assert_eq!(handles[4].state(), RequestState::Completed);
    }

    #[test]
    fn cancel_by_id_stops_running_request() {
        let log = Log::default();
        let cfg = SchedulerConfig {
            step_budget: 1,
            ..Default::default()
        };
        let mut s = scheduler(open_grid(10, 10), cfg);
        let h = s
            .submit(Point::new(0, 0), Point::new(9, 9), Algorithm::HeuristicGuided, record(&log, "a"))
            .unwrap();
        s.tick();
        assert!(s.cancel(h.id()));
        assert!(log.borrow().is_empty());
        s.tick();
        assert_eq!(h.state(), RequestState::Cancelled);
        assert_eq!(*log.borrow(), vec![("a", Vec::new())]);
    }

    #[test]
    fn failure_and_unreachable_both_deliver_empty_paths() {
        let mut cells: Vec<(Point, f64)> = Range::new(0, 0, 2, 2).iter().map(|p| (p, 1.0)).collect();
        cells.extend(Range::new(5, 5, 7, 7).iter().map(|p| (p, 1.0)));
        let grid = Rc::new(WeightedGrid::from_cells(cells).unwrap());
        let log = Log::default();
        let cfg = SchedulerConfig {
            max_concurrency: 2,
            ..Default::default()
        };
        let mut s = scheduler(grid, cfg);
        let bad = s
            .submit(Point::new(0, 0), Point::new(3, 3), Algorithm::UniformCost, record(&log, "bad"))
            .unwrap();
        let apart = s
            .submit(Point::new(0, 0), Point::new(6, 6), Algorithm::HeuristicGuided, record(&log, "apart"))
            .unwrap();
        s.run_until_idle(10);
        assert_eq!(bad.state(), RequestState::Failed);
        assert_eq!(apart.state(), RequestState::Completed);
        assert!(log.borrow().iter().all(|(_, p)| p.is_empty()));
        assert_eq!(s.stats().failed, 1);
        assert_eq!(s.stats().completed, 1);
    }

    #[test]
    fn same_start_and_end_completes_on_first_tick() {
        let log = Log::default();
        let mut s = scheduler(open_grid(4, 4), SchedulerConfig::default());
        let c = Point::new(2, 3);
        s.submit(c, c, Algorithm::UniformCost, record(&log, "a")).unwrap();
        assert_eq!(s.tick(), 1);
        assert_eq!(*log.borrow(), vec![("a", vec![c])]);
    }

    #[test]
    fn bounded_queue_rejects() {
        let cfg = SchedulerConfig {
            max_queue: Some(2),
            ..Default::default()
        };
        let mut s = scheduler(open_grid(3, 3), cfg);
        let p = Point::new(0, 0);
        s.submit(p, p, Algorithm::UniformCost, |_| {}).unwrap();
        s.submit(p, p, Algorithm::UniformCost, |_| {}).unwrap();
        let err = s.submit(p, p, Algorithm::UniformCost, |_| {}).unwrap_err();
        assert_eq!(err, SubmitError::QueueFull { capacity: 2 });
        assert_eq!(s.pending_len(), 2);
        assert_eq!(s.stats().rejected, 1);
        assert_eq!(s.stats().submitted, 2);
    }

    #[test]
    fn bounded_queue_drops_oldest() {
        let log = Log::default();
        let cfg = SchedulerConfig {
            max_queue: Some(1),
            overflow: OverflowPolicy::DropOldest,
            ..Default::default()
        };
        let mut s = scheduler(open_grid(3, 3), cfg);
        let p = Point::new(1, 1);
        let first = s.submit(p, p, Algorithm::UniformCost, record(&log, "first")).unwrap();
        let second = s.submit(p, p, Algorithm::UniformCost, record(&log, "second")).unwrap();
        assert_eq!(first.state(), RequestState::Cancelled);
        assert_eq!(*log.borrow(), vec![("first", Vec::new())]);
        s.tick();
        assert_eq!(second.state(), RequestState::Completed);
        assert_eq!(names(&log), vec!["first", "second"]);
    }

    #[test]
    fn repeated_runs_give_identical_paths() {
        let run = || {
            let log = Log::default();
            let mut s = scheduler(open_grid(15, 15), SchedulerConfig::default());
            for algo in [Algorithm::UniformCost, Algorithm::HeuristicGuided] {
                s.submit(Point::new(0, 14), Point::new(14, 0), algo, record(&log, "r"))
                    .unwrap();
            }
            let ticks = s.run_until_idle(10_000);
            let paths: Vec<Vec<Point>> = log.borrow().iter().map(|(_, p)| p.clone()).collect();
            (ticks, paths)
        };
        assert_eq!(run(), run());
    }
}
