//! # Scheduler events emitted for every compile request.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Admission events**: a request is queued or admitted
//! - **Compile events**: recompile notice, success, failure
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! resource identifier, gate occupancy and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use nimvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CompileFailed)
//!     .with_resource("src/main.nim")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::CompileFailed);
//! assert_eq!(ev.resource.as_deref(), Some("src/main.nim"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `resource`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `resource`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Loader events ===
    /// The loader decided the host runs in watch mode.
    ///
    /// Sets:
    /// - `resource`: resource identifier
    /// - `reason`: number of watched directories
    WatchModeDetected,

    // === Admission events ===
    /// Request submitted but the gate is full.
    ///
    /// Sets:
    /// - `resource`: resource identifier
    /// - `running`: compiles running at submission
    /// - `limit`: request's concurrency limit
    CompileQueued,

    /// Request admitted; its compile is about to launch.
    ///
    /// Sets:
    /// - `resource`: resource identifier
    /// - `running`: compiles running including this one
    /// - `limit`: request's concurrency limit
    CompileAdmitted,

    // === Compile events ===
    /// A resource that already compiled once is being compiled again.
    ///
    /// Sets:
    /// - `resource`: resource identifier
    RecompileStarted,

    /// Compile finished with output.
    ///
    /// Sets:
    /// - `resource`: resource identifier
    /// - `elapsed_ms`: compile duration
    CompileSucceeded,

    /// Compile finished with an error.
    ///
    /// Sets:
    /// - `resource`: resource identifier
    /// - `reason`: normalized error message
    /// - `elapsed_ms`: compile duration
    CompileFailed,
}

/// Scheduler event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Resource identifier (or subscriber name for subscriber events).
    pub resource: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Gate occupancy observed when the event was published.
    pub running: Option<u32>,
    /// Concurrency limit of the request.
    pub limit: Option<u32>,
    /// Compile duration in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            resource: None,
            reason: None,
            running: None,
            limit: None,
            elapsed_ms: None,
        }
    }

    /// Attaches a resource identifier.
    #[inline]
    pub fn with_resource(mut self, resource: impl Into<Arc<str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches gate occupancy and the request's limit.
    #[inline]
    pub fn with_gate(mut self, running: usize, limit: usize) -> Self {
        self.running = Some(running.min(u32::MAX as usize) as u32);
        self.limit = Some(limit.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a compile duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_resource(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_resource(subscriber)
            .with_reason(info)
    }
}
