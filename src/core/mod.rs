//! Scheduler core: admission and compile execution.
//!
//! The public API from this module is [`Scheduler`] (with its builder) and the
//! request types. Everything else is wiring.
//!
//! Internal modules:
//! - [`gate`]: counts running compiles, queues or polls waiters, releases on drop;
//! - [`runner`]: runs one admitted compile and publishes its terminal event;
//! - [`completed`]: resources that compiled successfully at least once;
//! - [`scheduler`]: ties gate, runner and bus together;
//! - [`builder`]: constructs a scheduler and its subscriber workers.

mod builder;
mod completed;
mod gate;
mod request;
mod runner;
mod scheduler;

pub use builder::SchedulerBuilder;
pub use request::{CompileHandle, CompileRequest, RequestState};
pub use scheduler::Scheduler;
