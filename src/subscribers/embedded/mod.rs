//! # Built-in subscribers
//!
//! - [`LogWriter`]: prints events in a human-readable form, including the
//!   recompile notice.

mod log;

pub use log::{LogWriter, RECOMPILE_NOTICE};
