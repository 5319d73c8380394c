//! # Loader entry point.
//!
//! [`Loader`] is what a build-tool integration calls once per resource. It
//! turns the host's option bags into a [`CompileRequest`], decides whether the
//! host is watching, and hands the request to the shared [`Scheduler`].
//!
//! ## Flow
//! ```text
//! prepare(resource, options)
//!   ├─► LoaderOptions::resolve(global, options)          ─ ConfigError
//!   ├─► files_for(resource)                              ─ ConfigError (not array / empty)
//!   ├─► watch = forceWatch || host_watching (argv, checked once per Loader)
//!   │     └─► cwd set → files_to_watch(cwd)              ─ ManifestError
//!   └─► PreparedCompile { request, watch, watch_dirs, cacheable }
//!
//! load(..)               = prepare + schedule().await
//! load_with_callback(..) = prepare (errors returned immediately) + submit_with_callback
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::{
    core::{CompileRequest, Scheduler},
    error::{CompileError, LoaderError},
    events::{Event, EventKind},
    options::LoaderOptions,
    watch::{files_to_watch, is_watch_mode, is_watch_mode_env},
};

/// A validated compile plus what the host needs to know about it.
#[derive(Clone, Debug)]
pub struct PreparedCompile {
    /// Request to schedule.
    pub request: CompileRequest,
    /// The host is watching (forced or detected).
    pub watch: bool,
    /// Directories the host should watch; empty unless `watch` and `cwd` are set.
    pub watch_dirs: Vec<PathBuf>,
    /// The host may cache the output. Always `true`; the `cache` option only
    /// reaches the compiler.
    pub cacheable: bool,
}

/// Per-process loader bound to a shared scheduler.
#[derive(Clone)]
pub struct Loader {
    scheduler: Arc<Scheduler>,
    host_watching: bool,
    global: Option<Value>,
}

impl Loader {
    /// Creates a loader, detecting watch mode from the current process arguments.
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            host_watching: is_watch_mode_env(),
            global: None,
        }
    }

    /// Re-detects watch mode from `argv` instead of the process arguments.
    pub fn with_argv<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let argv: Vec<S> = argv.into_iter().collect();
        self.host_watching = is_watch_mode(&argv);
        self
    }

    /// Whether the host's arguments put it in watch mode.
    pub fn host_watching(&self) -> bool {
        self.host_watching
    }

    /// Sets options shared by every resource (overridden per call).
    pub fn with_global_options(mut self, global: Value) -> Self {
        self.global = Some(global);
        self
    }

    /// The scheduler this loader submits to.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Validates options and builds the request for `resource`.
    ///
    /// Nothing is scheduled; every error here is returned before any compile starts.
    pub fn prepare(
        &self,
        resource: &str,
        options: Option<&Value>,
    ) -> Result<PreparedCompile, LoaderError> {
        let opts = LoaderOptions::resolve(self.global.as_ref(), options)?;
        let files = opts.files_for(resource)?;

        let watch = opts.force_watch || self.host_watching;
        let watch_dirs = match (&opts.cwd, watch) {
            (Some(cwd), true) => files_to_watch(cwd)?,
            _ => Vec::new(),
        };
        if watch {
            self.scheduler.bus().publish(
                Event::new(EventKind::WatchModeDetected)
                    .with_resource(resource)
                    .with_reason(watch_dirs.len().to_string()),
            );
        }

        let mut request =
            CompileRequest::new(resource, files).with_options(opts.compiler_options());
        if let Some(limit) = opts.max_instances {
            request = request.with_limit(limit);
        }

        Ok(PreparedCompile {
            request,
            watch,
            watch_dirs,
            cacheable: true,
        })
    }

    /// Prepares and compiles `resource`, returning its output.
    pub async fn load(&self, resource: &str, options: Option<&Value>) -> Result<String, LoaderError> {
        let prepared = self.prepare(resource, options)?;
        Ok(self.scheduler.schedule(prepared.request).await?)
    }

    /// Prepares `resource` and compiles it in the background.
    ///
    /// Option and manifest errors are returned immediately and `callback` is
    /// never called. Otherwise `callback` receives the result exactly once.
    pub fn load_with_callback<F>(
        &self,
        resource: &str,
        options: Option<&Value>,
        callback: F,
    ) -> Result<PreparedCompile, LoaderError>
    where
        F: FnOnce(Result<String, CompileError>) + Send + 'static,
    {
        let prepared = self.prepare(resource, options)?;
        self.scheduler
            .submit_with_callback(prepared.request.clone(), callback);
        Ok(prepared)
    }
}
