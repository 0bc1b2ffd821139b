//! Cooperative scheduling of path computations.
//!
//! A [`Scheduler`] owns a FIFO admission queue of path requests and a
//! bounded set of running [`PathComputation`](routegrid_paths::PathComputation)s.
//! The host calls [`Scheduler::tick`] once per cycle; each tick admits
//! queued requests into free slots and advances every running computation
//! by a bounded step. Every submitted request's callback fires exactly once,
//! with an empty path for "no route", invalid endpoints, and cancellation.
//!
//! Everything runs on the caller's thread; there are no timers or workers.

pub mod config;
pub mod request;
pub mod scheduler;

pub use config::{ConfigError, OverflowPolicy, SchedulerConfig};
pub use request::{RequestHandle, RequestId, RequestState};
pub use scheduler::{Scheduler, SchedulerStats, SubmitError};
