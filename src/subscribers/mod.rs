//! # Event subscribers for the scheduler.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Scheduler ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                           │
//!                                                  ┌────────┼────────┐
//!                                                  ▼        ▼        ▼
//!                                              LogWriter  Custom   ...
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod embedded;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::{LogWriter, RECOMPILE_NOTICE};
