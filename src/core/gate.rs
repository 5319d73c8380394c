//! # Admission gate: bounded concurrency for compiles.
//!
//! The gate counts running compiles and admits a new one only while
//! `running < limit`, where `limit` is supplied per request. A [`GatePermit`]
//! represents one admitted compile; dropping it releases the slot exactly once.
//!
//! ## Waiting strategies
//! ```text
//! Queue (default):
//!   enter(limit) ── slot free & no waiters ──► Admitted(permit)
//!        └───────── otherwise ──► push_back(waiter) ──► Queued
//!   permit dropped ──► running -= 1 ──► wake front waiters while running < front.limit
//!
//! Poll:
//!   enter(limit) ── slot free ──► Admitted(permit)
//!        └───────── otherwise ──► Queued ──► every poll_interval: try again
//! ```
//!
//! ## Rules
//! - `running <= limit` holds for every admitted request at the moment it is admitted
//! - Queue mode admits strictly in submission order (head-of-line blocking included)
//! - A waiter whose future is dropped never leaks a slot
//! - After [`AdmissionGate::close`] waiting and new requests fail with `Closed`;
//!   running compiles are unaffected
//! - `pending` counts queued waiters and live pollers alike

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, oneshot};

use crate::config::AdmissionMode;
use crate::error::CompileError;

/// One queued request (Queue mode).
struct Waiter {
    limit: usize,
    wake: oneshot::Sender<()>,
}

struct GateState {
    running: usize,
    polling: usize,
    closed: bool,
    waiters: VecDeque<Waiter>,
}

/// Process-wide counter of running compiles.
pub(crate) struct AdmissionGate {
    state: Mutex<GateState>,
    idle: Notify,
    mode: AdmissionMode,
    poll_interval: Duration,
}

/// Result of [`AdmissionGate::enter`].
pub(crate) enum Entry {
    /// A slot was free.
    Admitted(GatePermit),
    /// The request must wait.
    Queued(Pending),
}

/// A request waiting for a slot.
pub(crate) enum Pending {
    /// Woken by a release (Queue mode).
    Wait(Ticket),
    /// Re-checks the gate on an interval (Poll mode).
    Poll(Poller),
}

/// A live poll-mode waiter; counted in [`AdmissionGate::pending`] until dropped.
pub(crate) struct Poller {
    gate: Arc<AdmissionGate>,
    limit: usize,
}

/// Receiving side of a queued waiter.
///
/// The releasing side increments `running` before waking us, so a ticket that
/// was woken but never turned into a permit gives the slot back on drop.
pub(crate) struct Ticket {
    gate: Arc<AdmissionGate>,
    rx: Option<oneshot::Receiver<()>>,
}

/// Slot held by one running compile; released on drop.
pub(crate) struct GatePermit {
    gate: Arc<AdmissionGate>,
}

impl AdmissionGate {
    pub(crate) fn new(mode: AdmissionMode, poll_interval: Duration) -> Self {
        Self {
            state: Mutex::new(GateState {
                running: 0,
                polling: 0,
                closed: false,
                waiters: VecDeque::new(),
            }),
            idle: Notify::new(),
            mode,
            poll_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of compiles currently holding a slot.
    pub(crate) fn running(&self) -> usize {
        self.lock().running
    }

    /// Number of requests waiting for a slot, queued or polling.
    pub(crate) fn pending(&self) -> usize {
        let st = self.lock();
        let queued = st.waiters.iter().filter(|w| !w.wake.is_closed()).count();
        queued + st.polling
    }

    /// Resolves once no compile holds a slot.
    pub(crate) async fn idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.running() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Tries to admit a request with the given limit, queueing it otherwise.
    pub(crate) fn enter(self: &Arc<Self>, limit: usize) -> Result<Entry, CompileError> {
        let limit = limit.max(1);
        let mut st = self.lock();
        if st.closed {
            return Err(CompileError::Closed);
        }

        st.waiters.retain(|w| !w.wake.is_closed());
        if st.waiters.is_empty() && st.running < limit {
            st.running += 1;
            return Ok(Entry::Admitted(GatePermit {
                gate: Arc::clone(self),
            }));
        }

        let pending = match self.mode {
            AdmissionMode::Queue => {
                let (wake, rx) = oneshot::channel();
                st.waiters.push_back(Waiter { limit, wake });
                Pending::Wait(Ticket {
                    gate: Arc::clone(self),
                    rx: Some(rx),
                })
            }
            AdmissionMode::Poll => {
                st.polling += 1;
                Pending::Poll(Poller {
                    gate: Arc::clone(self),
                    limit,
                })
            }
        };
        Ok(Entry::Queued(pending))
    }

    /// Non-blocking admission used by the poll loop.
    fn try_admit(self: &Arc<Self>, limit: usize) -> Result<Option<GatePermit>, CompileError> {
        let mut st = self.lock();
        if st.closed {
            return Err(CompileError::Closed);
        }
        if st.running >= limit {
            return Ok(None);
        }
        st.running += 1;
        Ok(Some(GatePermit {
            gate: Arc::clone(self),
        }))
    }

    /// Frees one slot and hands freed capacity to queued waiters.
    fn release(&self) {
        let mut st = self.lock();
        st.running = st.running.saturating_sub(1);
        Self::wake_waiters(&mut st);
        if st.running == 0 {
            self.idle.notify_waiters();
        }
    }

    fn wake_waiters(st: &mut GateState) {
        while let Some(front) = st.waiters.front() {
            if !front.wake.is_closed() && st.running >= front.limit {
                break;
            }
            let Some(waiter) = st.waiters.pop_front() else {
                break;
            };
            // Count the slot first; a failed send means the waiter is gone.
            st.running += 1;
            if waiter.wake.send(()).is_err() {
                st.running -= 1;
            }
        }
    }

    /// Rejects new and waiting requests; running compiles keep their slots.
    pub(crate) fn close(&self) {
        let mut st = self.lock();
        st.closed = true;
        st.waiters.clear();
    }
}

impl Pending {
    /// Waits until the request holds a slot.
    pub(crate) async fn admitted(self) -> Result<GatePermit, CompileError> {
        match self {
            Pending::Wait(mut ticket) => {
                let Some(rx) = ticket.rx.as_mut() else {
                    return Err(CompileError::Closed);
                };
                let woken = rx.await;
                ticket.rx = None;
                match woken {
                    Ok(()) => Ok(GatePermit {
                        gate: Arc::clone(&ticket.gate),
                    }),
                    Err(_) => Err(CompileError::Closed),
                }
            }
            Pending::Poll(poller) => {
                let interval = poller.gate.poll_interval;
                loop {
                    tokio::time::sleep(interval).await;
                    if let Some(permit) = poller.gate.try_admit(poller.limit)? {
                        return Ok(permit);
                    }
                }
            }
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        rx.close();
        if rx.try_recv().is_ok() {
            self.gate.release();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let mut st = self.gate.lock();
        st.polling = st.polling.saturating_sub(1);
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
