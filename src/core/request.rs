//! # Compile requests and their lifecycle.
//!
//! A [`CompileRequest`] is one unit of work. Once submitted it moves through
//! [`RequestState`]:
//!
//! ```text
//! Pending ──► Admitted ──► Running ──┬─► Succeeded
//!                                    └─► Failed
//! Pending ──► Failed              (scheduler closed before admission)
//! ```
//!
//! Every request reaches exactly one terminal state and produces exactly one
//! result, observable through a [`CompileHandle`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{oneshot, watch};

use crate::error::CompileError;
use crate::options::CompilerOptions;

/// One unit of compile work.
#[derive(Clone, Debug)]
pub struct CompileRequest {
    resource: Arc<str>,
    files: Vec<PathBuf>,
    options: CompilerOptions,
    limit: Option<usize>,
}

impl CompileRequest {
    /// Creates a request for `resource` compiling `files`.
    pub fn new(resource: impl Into<Arc<str>>, files: Vec<PathBuf>) -> Self {
        Self {
            resource: resource.into(),
            files,
            options: CompilerOptions::default(),
            limit: None,
        }
    }

    /// Returns a new request with the given compiler options.
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns a new request with its own concurrency limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resource identifier (primary source path).
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub(crate) fn resource_arc(&self) -> Arc<str> {
        Arc::clone(&self.resource)
    }

    /// Input files, in order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Options forwarded to the compiler.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Per-request concurrency limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

/// Lifecycle state of a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Waiting for a slot.
    Pending,
    /// Holds a slot; the compile is about to launch.
    Admitted,
    /// Compiler invoked.
    Running,
    /// Delivered output.
    Succeeded,
    /// Delivered an error.
    Failed,
}

impl RequestState {
    /// Returns `true` for `Succeeded` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }
}

/// Handle to a request submitted with [`Scheduler::submit`](crate::Scheduler::submit).
pub struct CompileHandle {
    state: watch::Receiver<RequestState>,
    result: oneshot::Receiver<Result<String, CompileError>>,
}

impl CompileHandle {
    pub(crate) fn new(
        state: watch::Receiver<RequestState>,
        result: oneshot::Receiver<Result<String, CompileError>>,
    ) -> Self {
        Self { state, result }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        *self.state.borrow()
    }

    /// Waits until the request reaches `target` or a terminal state.
    pub async fn wait_for(&mut self, target: RequestState) -> RequestState {
        let reached = self
            .state
            .wait_for(|s| *s == target || s.is_terminal())
            .await
            .map(|s| *s);
        reached.unwrap_or_else(|_| *self.state.borrow())
    }

    /// Waits for the single result of this request.
    ///
    /// Returns [`CompileError::Closed`] if the runtime dropped the request.
    pub async fn result(self) -> Result<String, CompileError> {
        self.result.await.unwrap_or(Err(CompileError::Closed))
    }
}
