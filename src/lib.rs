//! # nimvisor
//!
//! **Nimvisor** schedules Nim compiler runs on behalf of build-tool loaders.
//!
//! A bundler calls its loader once per `.nim` resource, often many times in
//! parallel. Each call would otherwise spawn its own compiler process. Nimvisor
//! admits at most `limit` compiles at once (one by default), queues the rest,
//! delivers exactly one result per call and tells the loader whether the host
//! is running in watch mode.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Loader::load │   │ Loader::load │   │ Loader::load │
//!     │  (main.nim)  │   │  (util.nim)  │   │  (app.nim)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ options ⊕ argv ⊕ nim.json           │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler (one per process)                                      │
//! │  - AdmissionGate (running count, FIFO waiters or polling)         │
//! │  - CompletedSet (resources that compiled at least once)           │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ run_compile  │   │   (queued)   │   │   (queued)   │   │
//!     │  Compiler    │   │              │   │              │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ CompileAdmitted  │ CompileQueued    │ CompileQueued   │
//!      │ CompileSucceeded │ ...              │ ...             │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │              (capacity: SchedulerConfig::bus_capacity)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          (per-sub queues)
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter   worker2    workerN
//! ```
//!
//! ### Lifecycle of one request
//! ```text
//! Loader::prepare ──► CompileRequest ──► Scheduler::schedule / submit
//!
//!   ├─► gate.enter(limit)
//!   │     ├─ running < limit and nobody waiting ─► Admitted
//!   │     └─ otherwise ─► CompileQueued, wait for a released slot
//!   ├─► CompileAdmitted
//!   ├─► RecompileStarted (resource compiled before)
//!   ├─► compiler.compile_to_string(files, options)
//!   ├─► release slot, wake next waiter
//!   └─► CompileSucceeded / CompileFailed ─► one Result to the caller
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Loader**        | Option layering, validation, watch detection.                | [`Loader`], [`LoaderOptions`]             |
//! | **Scheduling**    | Bounded concurrency with FIFO or polled admission.           | [`Scheduler`], [`CompileRequest`]         |
//! | **Compilers**     | Plug in the compiler as a trait, closure or process.         | [`Compiler`], [`CompilerFn`], [`ProcessCompiler`] |
//! | **Watch mode**    | Argument inspection and `nim.json` source directories.       | [`is_watch_mode`], [`files_to_watch`]     |
//! | **Subscriber API**| Hook into compile lifecycle events.                          | [`Subscribe`], [`Event`]                  |
//! | **Errors**        | Typed errors for options, manifests and compiles.            | [`LoaderError`], [`CompileError`]         |
//! | **Configuration** | Centralize scheduler settings.                               | [`SchedulerConfig`], [`AdmissionMode`]    |
//!
//! ## Optional features
//! - `logging` (default): exports a built-in [`LogWriter`] printing the recompile notice.
//!
//! ## Example
//! ```rust
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use nimvisor::{
//!     CompilerFailure, CompilerFn, CompilerOptions, Loader, Scheduler, SchedulerConfig,
//! };
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let compiler = CompilerFn::arc(|files: Vec<PathBuf>, _opts: CompilerOptions| async move {
//!         Ok::<_, CompilerFailure>(format!("// compiled {}", files[0].display()))
//!     });
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn nimvisor::Subscribe>> = vec![Arc::new(nimvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn nimvisor::Subscribe>> = Vec::new();
//!
//!     let scheduler = Scheduler::builder(SchedulerConfig::default(), compiler)
//!         .with_subscribers(subs)
//!         .build();
//!     let loader = Loader::new(scheduler).with_argv(["node", "webpack"]);
//!
//!     let out = loader.load("src/main.nim", Some(&json!({ "optimize": true }))).await?;
//!     assert_eq!(out, "// compiled src/main.nim");
//!     Ok(())
//! }
//! ```
mod compiler;
mod config;
mod core;
mod error;
mod events;
mod loader;
mod options;
mod subscribers;
mod watch;

// ---- Public re-exports ----

pub use compiler::{Compiler, CompilerFn, CompilerRef, ProcessCompiler};
pub use config::{AdmissionMode, SchedulerConfig};
pub use crate::core::{CompileHandle, CompileRequest, RequestState, Scheduler, SchedulerBuilder};
pub use error::{
    CompileError, CompilerFailure, ConfigError, EXITED_PREFIX, LoaderError, ManifestError,
};
pub use events::{Bus, Event, EventKind};
pub use loader::{Loader, PreparedCompile};
pub use options::{CompilerOptions, LoaderOptions, OptionBag};
pub use subscribers::{Subscribe, SubscriberSet};
pub use watch::{MANIFEST_FILE, files_to_watch, is_watch_mode, is_watch_mode_env};

// Optional: built-in stdout subscriber.
// Disable with: `--no-default-features`
#[cfg(feature = "logging")]
pub use subscribers::{LogWriter, RECOMPILE_NOTICE};
