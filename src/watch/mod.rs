//! Watch-mode support.
//!
//! - [`is_watch_mode`] decides from process arguments whether the host stays alive.
//! - [`files_to_watch`] lists the directories a watching host should track.

mod detect;
mod manifest;

pub use detect::{is_watch_mode, is_watch_mode_env};
pub use manifest::{MANIFEST_FILE, files_to_watch};
