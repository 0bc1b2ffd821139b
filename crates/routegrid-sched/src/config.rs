//! Scheduler configuration.

use std::fmt;

/// Default number of computations advanced concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

/// Default iterations granted to each running computation per tick.
pub const DEFAULT_STEP_BUDGET: usize = 100;

/// What [`Scheduler::submit`](crate::Scheduler::submit) does when a bounded
/// queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OverflowPolicy {
    /// Refuse the new request.
    #[default]
    Reject,
    /// Cancel the oldest pending request to make room.
    DropOldest,
}

/// Tunables for a [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// Maximum number of computations running at once.
    pub max_concurrency: usize,
    /// Iterations each running computation may perform per tick.
    pub step_budget: usize,
    /// Maximum pending requests; `None` means unbounded.
    pub max_queue: Option<usize>,
    /// Behaviour when `max_queue` is reached.
    pub overflow: OverflowPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            step_budget: DEFAULT_STEP_BUDGET,
            max_queue: None,
            overflow: OverflowPolicy::Reject,
        }
    }
}

impl SchedulerConfig {
    /// Check the configuration for values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.step_budget == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }
        if self.max_queue == Some(0) {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

/// A [`SchedulerConfig`] that cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_concurrency` is zero, so nothing could ever run.
    ZeroConcurrency,
    /// `step_budget` is zero, so no computation could make progress.
    ZeroStepBudget,
    /// `max_queue` is `Some(0)`, so every submission would be refused.
    ZeroQueueCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroConcurrency => f.write_str("scheduler: max_concurrency must be at least 1"),
            Self::ZeroStepBudget => f.write_str("scheduler: step_budget must be at least 1"),
            Self::ZeroQueueCapacity => {
                f.write_str("scheduler: max_queue must be at least 1 when set")
            }
        }
    }
}

impl std::error::Error for ConfigError {}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: SchedulerConfig = serde_json::from_str(r#"{"max_concurrency":4}"#).unwrap();
        assert_eq!(cfg.max_concurrency, 4);
        assert_eq!(cfg.step_budget, DEFAULT_STEP_BUDGET);
        assert_eq!(cfg.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn overflow_policy_is_snake_case() {
        let cfg: SchedulerConfig =
            serde_json::from_str(r#"{"max_queue":8,"overflow":"drop_oldest"}"#).unwrap();
        assert_eq!(cfg.max_queue, Some(8));
        assert_eq!(cfg.overflow, OverflowPolicy::DropOldest);
    }
}
