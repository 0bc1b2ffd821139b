//! Cancellation flag shared between a path computation and whoever asked
//! for it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation flag for one path computation.
///
/// The requester keeps one clone and the computation another. Setting the
/// flag does not interrupt anything: a computation reads it at the start
/// of each bounded step and, once set, stops without doing further work.
/// A step already in progress always runs to the end of its budget.
#[derive(Clone, Debug)]
pub struct Context {
    done: Arc<AtomicBool>,
}

impl Context {
    /// A fresh flag, not yet cancelled.
    pub fn new() -> Self {
        Self {
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the requester has withdrawn the computation.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Relaxed)
    }

    /// Withdraw the computation. Idempotent; there is no way to un-cancel.
    #[inline]
    pub fn cancel(&self) {
        self.done.store(true, Ordering::Relaxed);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requester_cancel_reaches_computation() {
        let requester = Context::new();
        let computation = requester.clone();
        assert!(!computation.is_done());
        requester.cancel();
        requester.cancel();
        assert!(computation.is_done());
    }

    #[test]
    fn separate_requests_have_separate_flags() {
        let a = Context::default();
        let b = Context::default();
        a.cancel();
        assert!(a.is_done());
        assert!(!b.is_done());
    }
}
