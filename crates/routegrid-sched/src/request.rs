//! Path requests and the caller-side handle.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use routegrid_core::{Context, Point};
use routegrid_paths::Algorithm;

/// Opaque identifier, unique per request within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestId(pub(crate) u64);

impl RequestId {
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a request is in its lifecycle.
///
/// The completion callback only ever receives a path, and an empty path
/// means any of "unreachable", "invalid endpoint" or "cancelled". Callers
/// who need to tell these apart read the final state from their
/// [`RequestHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestState {
    /// Waiting in the admission queue.
    Pending,
    /// Admitted; its computation is being stepped.
    Running,
    /// Finished; the callback received the route (empty if unreachable).
    Completed,
    /// Withdrawn before finishing.
    Cancelled,
    /// The start or end was not in the grid.
    Failed,
}

impl RequestState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Completion callback; receives the route, or an empty vector.
pub type OnComplete = Box<dyn FnOnce(Vec<Point>)>;

/// Caller-side view of a submitted request.
///
/// Clones observe the same request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: RequestId,
    state: Rc<Cell<RequestState>>,
    ctx: Context,
}

impl RequestHandle {
    #[inline]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> RequestState {
        self.state.get()
    }

    /// Whether the completion callback has fired.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Withdraw the request.
    ///
    /// Takes effect on the scheduler's next tick: a pending request is
    /// dropped from the queue without ever starting, a running one stops
    /// stepping. Either way the callback fires once with an empty path.
    pub fn cancel(&self) {
        if !self.is_finished() {
            self.ctx.cancel();
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone.
    #[inline]
    pub fn is_cancel_requested(&self) -> bool {
        self.ctx.is_done()
    }
}

/// A queued or running request, as held by the scheduler.
pub(crate) struct PathRequest {
    pub(crate) id: RequestId,
    pub(crate) start: Point,
    pub(crate) end: Point,
    pub(crate) algorithm: Algorithm,
    pub(crate) ctx: Context,
    state: Rc<Cell<RequestState>>,
    on_complete: OnComplete,
}

impl PathRequest {
    pub(crate) fn new(
        id: RequestId,
        start: Point,
        end: Point,
        algorithm: Algorithm,
        on_complete: OnComplete,
    ) -> (Self, RequestHandle) {
        let state = Rc::new(Cell::new(RequestState::Pending));
        let ctx = Context::new();
        let handle = RequestHandle {
            id,
            state: state.clone(),
            ctx: ctx.clone(),
        };
        let req = Self {
            id,
            start,
            end,
            algorithm,
            ctx,
            state,
            on_complete,
        };
        (req, handle)
    }

    #[inline]
    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.ctx.is_done()
    }

    pub(crate) fn mark_running(&self) {
        self.state.set(RequestState::Running);
    }

    /// Record the final state, then hand the path to the callback.
    pub(crate) fn finish(self, state: RequestState, path: Vec<Point>) {
        debug_assert!(state.is_terminal());
        self.state.set(state);
        (self.on_complete)(path);
    }
}

impl fmt::Debug for PathRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRequest")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("algorithm", &self.algorithm)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}
