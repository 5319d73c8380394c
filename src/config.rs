//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`] centralized settings for the admission scheduler.
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `Scheduler::builder(config).build()`
//! 2. **Per-request limits**: `CompileRequest::new(..)` inherits `max_concurrent`
//!    unless the loader options carry `maxInstances`.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → clamped to 1 (a gate always admits at least one compile)
//! - `poll_interval = 0s` → clamped to 1ms in [`AdmissionMode::Poll`]

use std::time::Duration;

/// How pending requests wait for a free slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdmissionMode {
    /// Explicit FIFO queue; a released slot wakes the oldest waiter.
    ///
    /// Admission order equals submission order.
    #[default]
    Queue,

    /// Fixed-interval retry: each pending request re-checks the gate every
    /// `poll_interval`. Admission order between waiters is unspecified.
    Poll,
}

/// Global configuration for the admission scheduler.
///
/// ## Field semantics
/// - `max_concurrent`: default limit for requests that do not set their own (`0` → 1)
/// - `admission`: FIFO wake-up or interval polling
/// - `poll_interval`: re-check interval used by [`AdmissionMode::Poll`]
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Default number of compiles allowed to run at once.
    pub max_concurrent: usize,

    /// Waiting strategy for requests beyond the limit.
    pub admission: AdmissionMode,

    /// Re-check interval for [`AdmissionMode::Poll`].
    pub poll_interval: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl SchedulerConfig {
    /// Returns the default concurrency limit, never less than 1.
    #[inline]
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent.max(1)
    }

    /// Returns the poll interval, never zero.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 1` (one compiler process at a time)
    /// - `admission = AdmissionMode::Queue`
    /// - `poll_interval = 200ms`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            admission: AdmissionMode::Queue,
            poll_interval: Duration::from_millis(200),
            bus_capacity: 1024,
        }
    }
}
